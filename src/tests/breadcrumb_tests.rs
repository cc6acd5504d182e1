#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use crate::api::ItemBackend;
    use crate::breadcrumb::{BreadcrumbTrail, NavTarget, Navigator};
    use crate::directory::Directory;
    use crate::error::ClientError;
    use crate::metrics::Metrics;
    use crate::notify::{Notifier, ToastLevel};
    use crate::tests::support::{docs, page, MockBackend};
    use crate::types::{Crumb, ViewMode, ROOT_ID};

    fn crumb(id: i64, name: &str) -> Crumb {
        Crumb { id, name: name.to_string() }
    }

    async fn setup(view: ViewMode) -> (Arc<MockBackend>, Navigator, Notifier) {
        let backend = Arc::new(MockBackend::new());
        backend.set_list(|_| Ok(page(docs(1..=2), 0, 2, false)));
        backend.set_crumbs(1, &[(1, "Projects")]);
        backend.set_crumbs(7, &[(1, "Projects"), (7, "2024")]);
        backend.set_crumbs(9, &[(1, "Projects"), (7, "2024"), (9, "Q1")]);
        let notifier = Notifier::new();
        let items: Arc<dyn ItemBackend> = backend.clone();
        let directory = Arc::new(Directory::new(items.clone(), view, 20, notifier.clone(), Metrics::new()));
        let nav = Navigator::new(directory, items, notifier.clone()).await;
        (backend, nav, notifier)
    }

    #[test]
    fn test_new_trail_is_root_only() {
        let trail = BreadcrumbTrail::new("My Drive");
        assert_eq!(trail.len(), 1);
        assert_eq!(trail.current(), &crumb(ROOT_ID, "My Drive"));
    }

    #[test]
    fn test_click_truncates_trail() {
        let mut trail = BreadcrumbTrail::new("My Drive");
        trail.set_path("My Drive", vec![crumb(1, "Projects"), crumb(7, "2024"), crumb(9, "Q1")]);
        assert_eq!(trail.labels(), ["My Drive", "Projects", "2024", "Q1"]);

        assert_eq!(trail.click_segment(1), Some(NavTarget::Folder(1)));
        assert_eq!(trail.labels(), ["My Drive", "Projects"]);

        assert_eq!(trail.click_segment(0), Some(NavTarget::Root));
        assert_eq!(trail.len(), 1);
    }

    #[test]
    fn test_click_out_of_range_does_nothing() {
        let mut trail = BreadcrumbTrail::new("My Drive");
        trail.set_path("My Drive", vec![crumb(1, "Projects")]);
        assert_eq!(trail.click_segment(5), None);
        assert_eq!(trail.len(), 2);
    }

    #[test]
    fn test_server_root_entry_is_not_duplicated() {
        let mut trail = BreadcrumbTrail::new("Shared with me");
        trail.set_path("Shared with me", vec![crumb(ROOT_ID, "root"), crumb(3, "Team")]);
        assert_eq!(trail.labels(), ["Shared with me", "Team"]);
    }

    #[tokio::test]
    async fn test_navigate_replaces_trail_with_server_path() {
        let (backend, nav, _) = setup(ViewMode::MyDrive).await;

        nav.navigate(Some(9)).await.unwrap();

        let trail = nav.trail().await;
        assert_eq!(trail.labels(), ["My Drive", "Projects", "2024", "Q1"]);
        assert_eq!(trail.current().id, 9);
        assert_eq!(backend.last_query().tokens, vec!["parent.id:9".to_string()]);
    }

    #[tokio::test]
    async fn test_click_segment_navigates_to_ancestor() {
        let (backend, nav, _) = setup(ViewMode::MyDrive).await;
        nav.navigate(Some(9)).await.unwrap();

        nav.click_segment(1).await.unwrap();
        assert_eq!(nav.trail().await.labels(), ["My Drive", "Projects"]);
        assert_eq!(backend.last_query().tokens, vec!["parent.id:1".to_string()]);

        nav.click_segment(0).await.unwrap();
        assert_eq!(nav.trail().await.labels(), ["My Drive"]);
        assert!(backend.last_query().tokens.is_empty());
        assert_eq!(nav.directory().folder().await, None);
    }

    #[tokio::test]
    async fn test_invalid_click_does_not_fetch() {
        let (backend, nav, _) = setup(ViewMode::MyDrive).await;
        nav.navigate(Some(7)).await.unwrap();
        let calls = backend.queries().len();

        assert_eq!(nav.click_segment(4).await.unwrap(), None);
        assert_eq!(backend.queries().len(), calls);
    }

    #[tokio::test]
    async fn test_root_label_follows_view() {
        let (backend, nav, _) = setup(ViewMode::SharedWithMe).await;
        nav.navigate(Some(1)).await.unwrap();
        assert_eq!(nav.trail().await.labels(), ["Shared with me", "Projects"]);
        assert_eq!(backend.last_query().path(), "/items/shared");

        nav.switch_view(ViewMode::MyDrive).await.unwrap();
        assert_eq!(nav.trail().await.labels(), ["My Drive"]);
        assert_eq!(backend.last_query().path(), "/items");
    }

    #[tokio::test]
    async fn test_breadcrumb_failure_keeps_listing() {
        let (backend, nav, notifier) = setup(ViewMode::MyDrive).await;
        backend.fail_crumbs.store(true, Ordering::SeqCst);
        let mut toasts = notifier.subscribe();

        nav.navigate(Some(7)).await.unwrap();

        assert_eq!(nav.directory().snapshot().await.items.len(), 2);
        assert_eq!(nav.trail().await.labels(), ["My Drive"]);
        assert_eq!(toasts.try_recv().unwrap().level, ToastLevel::Warning);
    }

    #[tokio::test]
    async fn test_failed_listing_still_moves_trail() {
        let (backend, nav, notifier) = setup(ViewMode::MyDrive).await;
        nav.navigate(Some(1)).await.unwrap();
        backend.set_list(|q| {
            if q.tokens.contains(&"parent.id:7".to_string()) {
                Err(ClientError::Network("connection reset".into()))
            } else {
                Ok(page(docs(1..=2), 0, 2, false))
            }
        });
        let mut toasts = notifier.subscribe();

        assert!(nav.navigate(Some(7)).await.is_err());

        assert_eq!(nav.directory().folder().await, Some(7));
        assert_eq!(nav.trail().await.labels(), ["My Drive", "Projects", "2024"]);
        assert_eq!(toasts.try_recv().unwrap().level, ToastLevel::Error);
    }
}
