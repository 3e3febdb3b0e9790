//! Promotion of a whole store into a group's membership

use crate::promote::manager::PromotionManager;
use crate::promote::model::{GroupPromoteRequest, GroupPromoteResult};
use tracing::{info, warn};

impl PromotionManager {
    /// Append `request.source` to the target group's constituents.
    ///
    /// Problems are reported in the result rather than as errors. A store
    /// that is already a member is left where it is.
    pub fn promote_to_group(&self, request: GroupPromoteRequest) -> GroupPromoteResult {
        if !self.registry.contains(&request.source) {
            let message = format!("No such source store: {}", request.source);
            return GroupPromoteResult::failed(request, message);
        }

        let Some(mut group) = self.registry.get(&request.target_group) else {
            let message = format!("No such target group: {}", request.target_group);
            return GroupPromoteResult::failed(request, message);
        };

        let Some(constituents) = group.constituents_mut() else {
            let message = format!("{} is not a group", request.target_group);
            return GroupPromoteResult::failed(request, message);
        };

        if request.dry_run {
            info!("Dry run: {} would join {}", request.source, request.target_group);
            return GroupPromoteResult::ok(request);
        }

        if constituents.contains(&request.source) {
            info!("{} is already a member of {}", request.source, request.target_group);
            return GroupPromoteResult::ok(request);
        }

        constituents.push(request.source.clone());
        self.registry.put(group);
        info!("Added {} to {}", request.source, request.target_group);
        GroupPromoteResult::ok(request)
    }

    /// Remove the promoted store from the group again
    pub fn rollback_group_promote(&self, result: GroupPromoteResult) -> GroupPromoteResult {
        let request = result.request;

        let Some(mut group) = self.registry.get(&request.target_group) else {
            let message = format!("No such target group: {}", request.target_group);
            return GroupPromoteResult::failed(request, message);
        };

        let Some(constituents) = group.constituents_mut() else {
            let message = format!("{} is not a group", request.target_group);
            return GroupPromoteResult::failed(request, message);
        };

        let before = constituents.len();
        constituents.retain(|key| key != &request.source);
        if constituents.len() == before {
            warn!("{} is not a member of {}", request.source, request.target_group);
            let message = format!("{} is not a member of {}", request.source, request.target_group);
            return GroupPromoteResult::failed(request, message);
        }

        if !request.dry_run {
            self.registry.put(group);
            info!("Removed {} from {}", request.source, request.target_group);
        }
        GroupPromoteResult::ok(request)
    }
}
