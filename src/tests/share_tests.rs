#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use crate::error::ClientError;
    use crate::notify::{Notifier, ToastLevel};
    use crate::share::{required_level, share_item};
    use crate::tests::support::{doc, folder, MockBackend};
    use crate::types::PermissionLevel;

    #[tokio::test]
    async fn test_share_checks_permission_first() {
        let backend = MockBackend::new();
        let notifier = Notifier::new();
        let mut toasts = notifier.subscribe();
        let item = doc(7, "plan.docx");

        let permission = share_item(&backend, &notifier, &item, "bob@example.com", PermissionLevel::Viewer)
            .await
            .unwrap();

        assert_eq!(permission.email, "bob@example.com");
        assert_eq!(*backend.permission_checks.lock().unwrap(), vec![(7, PermissionLevel::Editor)]);
        let added = backend.permissions_added.lock().unwrap().clone();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].item_id, 7);
        assert_eq!(added[0].permission, PermissionLevel::Viewer);
        assert_eq!(toasts.try_recv().unwrap().level, ToastLevel::Success);
    }

    #[tokio::test]
    async fn test_denied_share_short_circuits() {
        let backend = MockBackend::new();
        backend.share_allowed.store(false, Ordering::SeqCst);
        let notifier = Notifier::new();
        let mut toasts = notifier.subscribe();

        let err = share_item(&backend, &notifier, &folder(3, "Team"), "bob@example.com", PermissionLevel::Editor)
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::PermissionDenied(_)));
        assert!(backend.permissions_added.lock().unwrap().is_empty());
        assert_eq!(toasts.try_recv().unwrap().level, ToastLevel::Warning);
    }

    #[tokio::test]
    async fn test_invalid_email_is_rejected_before_check() {
        let backend = MockBackend::new();
        let notifier = Notifier::new();

        let err = share_item(&backend, &notifier, &doc(1, "a"), "not-an-email", PermissionLevel::Viewer)
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::ValidationError { .. }));
        assert!(backend.permission_checks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_trashed_item_cannot_be_shared() {
        let backend = MockBackend::new();
        let mut item = doc(1, "old.docx");
        item.deleted_at = Some("2024-01-05T00:00:00".into());

        let res = share_item(&backend, &Notifier::new(), &item, "bob@example.com", PermissionLevel::Viewer).await;
        assert!(matches!(res, Err(ClientError::InvalidInput(_))));
        assert!(backend.permission_checks.lock().unwrap().is_empty());
    }

    #[test]
    fn test_required_level() {
        assert_eq!(required_level(PermissionLevel::Viewer), PermissionLevel::Editor);
        assert_eq!(required_level(PermissionLevel::Editor), PermissionLevel::Editor);
        assert_eq!(required_level(PermissionLevel::Owner), PermissionLevel::Owner);
    }
}
