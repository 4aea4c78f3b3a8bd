//! Integration tests for the WebSocket connector.
//!
//! These tests spin up a real WebSocket server on a random port and point
//! the connector at it, checking that frames flow both ways and that the
//! lifecycle events arrive in order.

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use signalforge_transport::{
        event_channel, Connection, Connector, EventStream, TransportError,
        TransportEvent, WebSocketConnector, CLOSE_NORMAL,
    };
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message;

    type ServerWs = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

    /// Binds a listener on a random port and returns it with its ws:// URL.
    async fn bind() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = listener.local_addr().expect("should have addr");
        (listener, format!("ws://{addr}"))
    }

    async fn accept(listener: &TcpListener) -> ServerWs {
        let (stream, _) = listener.accept().await.expect("should accept");
        tokio_tungstenite::accept_async(stream)
            .await
            .expect("handshake should succeed")
    }

    async fn next_event(events: &mut EventStream) -> TransportEvent {
        let (_, event) = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("event should arrive in time")
            .expect("stream should stay open");
        event
    }

    #[tokio::test]
    async fn test_open_send_and_receive() {
        let (listener, url) = bind().await;
        let (factory, mut events) = event_channel();

        let conn = WebSocketConnector::new().open(&url, factory.sink());
        let mut server = accept(&listener).await;

        match next_event(&mut events).await {
            TransportEvent::Opened(meta) => assert_eq!(meta.status, 101),
            other => panic!("expected Opened, got {other:?}"),
        }

        // --- Client sends, server receives ---
        conn.send(b"hello from client".to_vec())
            .expect("send should queue");
        let msg = server.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"hello from client");

        // --- Server sends, client receives ---
        server
            .send(Message::Binary(b"hello from server".to_vec().into()))
            .await
            .unwrap();
        match next_event(&mut events).await {
            TransportEvent::Message(data) => assert_eq!(data, b"hello from server"),
            other => panic!("expected Message, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_events_carry_connection_id() {
        let (listener, url) = bind().await;
        let (factory, mut events) = event_channel();

        let conn = WebSocketConnector::new().open(&url, factory.sink());
        let _server = accept(&listener).await;

        let (id, _) = events.recv().await.unwrap();
        assert_eq!(id, conn.id());
    }

    #[tokio::test]
    async fn test_server_close_reports_code_and_reason() {
        let (listener, url) = bind().await;
        let (factory, mut events) = event_channel();

        let _conn = WebSocketConnector::new().open(&url, factory.sink());
        let mut server = accept(&listener).await;
        assert!(matches!(next_event(&mut events).await, TransportEvent::Opened(_)));

        server.close(None).await.unwrap();

        match next_event(&mut events).await {
            TransportEvent::Closed { .. } => {}
            other => panic!("expected Closed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_local_close_emits_closed() {
        let (listener, url) = bind().await;
        let (factory, mut events) = event_channel();

        let conn = WebSocketConnector::new().open(&url, factory.sink());
        let _server = accept(&listener).await;
        assert!(matches!(next_event(&mut events).await, TransportEvent::Opened(_)));

        conn.close(CLOSE_NORMAL, "bye");

        match next_event(&mut events).await {
            TransportEvent::Closed { code, reason } => {
                assert_eq!(code, CLOSE_NORMAL);
                assert_eq!(reason, "bye");
            }
            other => panic!("expected Closed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connect_refused_emits_failed() {
        // Bind then drop to get a port nothing listens on.
        let (listener, url) = bind().await;
        drop(listener);
        let (factory, mut events) = event_channel();

        let _conn = WebSocketConnector::new().open(&url, factory.sink());

        match next_event(&mut events).await {
            TransportEvent::Failed { cause, response } => {
                assert!(matches!(cause, TransportError::ConnectFailed(_)));
                assert!(response.is_none());
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }
}
