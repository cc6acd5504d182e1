//! Sharing an item with another user.
//!
//! The current user's right to share is checked before anything is sent; a
//! denied check stops the flow with a warning and no change on the backend.

use crate::api::ShareBackend;
use crate::error::{validation, ClientError, ClientResult};
use crate::notify::Notifier;
use crate::types::{AddPermissionRequest, Item, ItemAction, Permission, PermissionLevel};

/// Permission the current user needs on an item to share it at `level`.
pub fn required_level(level: PermissionLevel) -> PermissionLevel {
    match level {
        PermissionLevel::Owner => PermissionLevel::Owner,
        PermissionLevel::Viewer | PermissionLevel::Editor => PermissionLevel::Editor,
    }
}

pub async fn share_item(
    backend: &dyn ShareBackend,
    notifier: &Notifier,
    item: &Item,
    email: &str,
    level: PermissionLevel,
) -> ClientResult<Permission> {
    if !item.allows(ItemAction::Share) {
        let err = ClientError::InvalidInput(format!("{} cannot be shared", item.name));
        notifier.warning(err.user_message());
        return Err(err);
    }
    if let Err(e) = validation::validate_email(email) {
        notifier.warning(e.user_message());
        return Err(e);
    }

    let allowed = match backend.check_permission(item.id, required_level(level)).await {
        Ok(allowed) => allowed,
        Err(e) => {
            notifier.error(format!("Could not check permissions: {}", e.user_message()));
            return Err(e);
        }
    };
    if !allowed {
        tracing::info!(item = item.id, "share denied by permission check");
        notifier.warning(format!("You are not allowed to share {}", item.name));
        return Err(ClientError::PermissionDenied(format!("sharing item {}", item.id)));
    }

    let req = AddPermissionRequest { item_id: item.id, email: email.trim().to_string(), permission: level };
    match backend.add_permission(&req).await {
        Ok(permission) => {
            tracing::info!(item = item.id, email = %req.email, level = level.as_str(), "item shared");
            notifier.success(format!("Shared {} with {}", item.name, req.email));
            Ok(permission)
        }
        Err(e) => {
            notifier.error(format!("Sharing failed: {}", e.user_message()));
            Err(e)
        }
    }
}
