#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use crate::error::ClientError;
    use crate::push::frame::Frame;
    use crate::push::Subscription;
    use crate::types::UploadProgressMessage;

    #[test]
    fn test_encode_subscribe_frame() {
        let frame = Frame::new("SUBSCRIBE")
            .header("id", "sub-0")
            .header("destination", "/user/queue/upload-progress");
        assert_eq!(frame.encode(), "SUBSCRIBE\nid:sub-0\ndestination:/user/queue/upload-progress\n\n\0");
    }

    #[test]
    fn test_encode_adds_content_length() {
        let frame = Frame::new("SEND").header("destination", "/app/x").body("{\"a\":1}");
        let encoded = frame.encode();
        assert!(encoded.contains("content-length:7\n"));
        assert!(encoded.ends_with("\n\n{\"a\":1}\0"));
    }

    #[test]
    fn test_encoded_frame_parses_back() {
        let frame = Frame::new("MESSAGE")
            .header("subscription", "sub-3")
            .header("note", "a:b")
            .body("payload");
        let frames = Frame::parse_all(&frame.encode()).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].get("note"), Some("a:b"));
        assert_eq!(frames[0].body, "payload");
    }

    #[test]
    fn test_connected_frame_with_heartbeats_around() {
        let raw = "\nCONNECTED\nversion:1.2\nheart-beat:0,0\n\n\0\n";
        let frames = Frame::parse_all(raw).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].command, "CONNECTED");
        assert_eq!(frames[0].get("version"), Some("1.2"));
    }

    #[test]
    fn test_bad_escape_is_rejected() {
        assert!(matches!(Frame::parse("MESSAGE\nx:a\\qb\n\n\0"), Err(ClientError::Push(_))));
    }

    #[tokio::test]
    async fn test_subscription_decodes_json() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut sub = Subscription::new("/user/queue/upload-progress", rx, || {});
        tx.send(r#"{"progressPercent":50,"currentChunk":1,"totalChunks":2}"#.to_string()).unwrap();
        tx.send("garbage".to_string()).unwrap();

        let msg: UploadProgressMessage = sub.recv_json().await.unwrap().unwrap();
        assert_eq!(msg.progress_percent, 50.0);
        assert!(msg.file_name.is_none());

        let bad = sub.recv_json::<UploadProgressMessage>().await.unwrap();
        assert!(matches!(bad, Err(ClientError::Decode(_))));

        drop(tx);
        assert!(sub.recv().await.is_none());
    }

    #[test]
    fn test_drop_unsubscribes_once() {
        let flag = Arc::new(AtomicBool::new(false));
        let (_tx, rx) = mpsc::unbounded_channel();
        let seen = flag.clone();
        let sub = Subscription::new("/topic/x", rx, move || {
            assert!(!seen.swap(true, Ordering::SeqCst));
        });
        assert_eq!(sub.destination(), "/topic/x");
        sub.unsubscribe();
        assert!(flag.load(Ordering::SeqCst));
    }
}
