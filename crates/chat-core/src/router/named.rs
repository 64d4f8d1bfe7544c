//! NamedRouter: the JSON command protocol.
//!
//! Each connection is in one of two states:
//!
//! ```text
//!   Anonymous ──setUsername ok──► Named ──setUsername ok──► Named (renamed)
//! ```
//!
//! | type             | needs Named | effect                                          |
//! |------------------|-------------|-------------------------------------------------|
//! | `setUsername`    | no          | bind name, reply `system`, broadcast user list  |
//! | `privateMessage` | yes         | recipient copy (`isSent:false`) + sender echo   |
//! | `getUserList`    | no          | reply `userList`                                |
//!
//! Every failure becomes one `error` frame to the sender (see
//! [`ChatError::reply_text`]); nothing here ever closes a connection.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, error, info, warn};

use crate::connection::{deliver, Connection, ConnectionRef};
use crate::domain::clock::Clock;
use crate::domain::error::{ChatError, ErrorKind};
use crate::domain::messages::{InboundMessage, OutboundMessage};
use crate::domain::mode::ChatMode;
use crate::domain::username::Username;
use crate::registry::{IdentityRegistry, Registration, RegistryError};
use crate::router::ChatRouter;

/// Greeting sent to every new connection.
pub const GREETING: &str = "Connected to chat server. Please set your username.";

/// Router for the named, private-message protocol.
pub struct NamedRouter {
    registry: Arc<IdentityRegistry>,
    clock: Arc<dyn Clock>,
    /// Serializes user-list broadcasts so the last list a client receives
    /// is never older than the registry state it was sent after.
    presence: Mutex<()>,
}

impl NamedRouter {
    pub fn new(registry: Arc<IdentityRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry,
            clock,
            presence: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &Arc<IdentityRegistry> {
        &self.registry
    }

    fn dispatch(&self, conn: &ConnectionRef, frame: &str) -> Result<(), ChatError> {
        let msg = InboundMessage::decode(frame)?;
        debug!("connection {}: {}", conn.id(), msg.type_name());

        match msg {
            InboundMessage::SetUsername { username } => self.set_username(conn, &username),
            InboundMessage::PrivateMessage { to, message } => {
                self.private_message(conn, &to, &message)
            }
            InboundMessage::GetUserList => {
                self.send(conn.as_ref(), &self.user_list());
                Ok(())
            }
        }
    }

    fn set_username(&self, conn: &ConnectionRef, raw: &str) -> Result<(), ChatError> {
        let username = Username::parse(raw)?;

        let outcome = self
            .registry
            .register(username.clone(), conn)
            .map_err(|RegistryError::AlreadyTaken(_)| ChatError::UsernameTaken)?;

        match &outcome {
            Registration::Registered => info!("user {username} joined the chat"),
            Registration::Renamed { previous } => info!("user {previous} is now {username}"),
            Registration::Unchanged => debug!("user {username} re-sent its own name"),
        }

        let reply = OutboundMessage::system(
            format!("Username set to: {username}"),
            self.clock.timestamp(),
        );
        self.send(conn.as_ref(), &reply);
        self.broadcast_user_list();
        Ok(())
    }

    fn private_message(
        &self,
        sender: &ConnectionRef,
        to: &str,
        message: &str,
    ) -> Result<(), ChatError> {
        let from = self
            .registry
            .username_of(sender.id())
            .ok_or(ChatError::NotNamed)?;
        let recipient = self
            .registry
            .lookup(to)
            .ok_or_else(|| ChatError::UserNotFound(to.to_string()))?;

        // One timestamp for both halves of the pair.
        let timestamp = self.clock.timestamp();
        let pair = |is_sent| OutboundMessage::PrivateMessage {
            from: from.to_string(),
            to: to.to_string(),
            message: message.to_string(),
            timestamp: timestamp.clone(),
            is_sent,
        };

        self.send(recipient.as_ref(), &pair(false));
        self.send(sender.as_ref(), &pair(true));
        debug!("private message {from} -> {to}");
        Ok(())
    }

    fn user_list(&self) -> OutboundMessage {
        OutboundMessage::UserList {
            users: self
                .registry
                .all_usernames()
                .into_iter()
                .map(Username::into_string)
                .collect(),
        }
    }

    /// Sends the current user list to every Named connection.
    ///
    /// The snapshot and the sends happen under `presence`; sends only
    /// enqueue, so the lock is held briefly.
    fn broadcast_user_list(&self) {
        let _presence = self.presence.lock().unwrap_or_else(PoisonError::into_inner);
        let frame = match self.user_list().encode() {
            Ok(frame) => frame,
            Err(e) => {
                error!("failed to encode user list: {e}");
                return;
            }
        };
        for conn in self.registry.named_connections() {
            deliver(conn.as_ref(), frame.clone());
        }
    }

    fn reply_error(&self, conn: &dyn Connection, err: &ChatError) {
        match err.kind() {
            ErrorKind::MalformedInput => warn!("connection {}: {err}", conn.id()),
            _ => debug!("connection {}: {err}", conn.id()),
        }
        self.send(
            conn,
            &OutboundMessage::error(err.reply_text(), self.clock.timestamp()),
        );
    }

    fn send(&self, conn: &dyn Connection, msg: &OutboundMessage) {
        match msg.encode() {
            Ok(frame) => {
                deliver(conn, frame);
            }
            Err(e) => error!("connection {}: JSON serialization error: {e}", conn.id()),
        }
    }
}

impl ChatRouter for NamedRouter {
    fn mode(&self) -> ChatMode {
        ChatMode::Named
    }

    fn on_connect(&self, conn: &ConnectionRef) {
        self.send(
            conn.as_ref(),
            &OutboundMessage::system(GREETING, self.clock.timestamp()),
        );
    }

    fn on_frame(&self, conn: &ConnectionRef, frame: &str) {
        if let Err(e) = self.dispatch(conn, frame) {
            self.reply_error(conn.as_ref(), &e);
        }
    }

    fn on_disconnect(&self, conn: &ConnectionRef) {
        if let Some(username) = self.registry.remove(conn.id()) {
            info!("user {username} disconnected");
            self.broadcast_user_list();
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::testing::{handle, RecordingConnection};
    use crate::connection::SendError;
    use crate::domain::ids::ConnectionId;
    use mockall::mock;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    struct FixedClock(&'static str);

    impl Clock for FixedClock {
        fn timestamp(&self) -> String {
            self.0.to_string()
        }
    }

    mock! {
        pub Conn {}
        impl Connection for Conn {
            fn id(&self) -> ConnectionId;
            fn is_open(&self) -> bool;
            fn send_text(&self, frame: String) -> Result<(), SendError>;
            fn close(&self);
        }
    }

    fn router() -> NamedRouter {
        NamedRouter::new(
            Arc::new(IdentityRegistry::new()),
            Arc::new(FixedClock("12:34:56")),
        )
    }

    fn set_name(router: &NamedRouter, conn: &Arc<RecordingConnection>, name: &str) {
        router.on_frame(
            &handle(conn),
            &json!({"type":"setUsername","username":name}).to_string(),
        );
    }

    /// Two Named connections, "alice" (1) and "bob" (2), with empty inboxes.
    fn alice_and_bob(router: &NamedRouter) -> (Arc<RecordingConnection>, Arc<RecordingConnection>) {
        let alice = RecordingConnection::new(1);
        let bob = RecordingConnection::new(2);
        set_name(router, &alice, "alice");
        set_name(router, &bob, "bob");
        alice.clear();
        bob.clear();
        (alice, bob)
    }

    fn only_error(conn: &RecordingConnection) -> String {
        let frames = conn.json_frames();
        assert_eq!(frames.len(), 1, "expected exactly one frame, got {frames:?}");
        assert_eq!(frames[0]["type"], "error");
        frames[0]["message"].as_str().unwrap().to_string()
    }

    #[test]
    fn test_connect_sends_greeting() {
        let router = router();
        let conn = RecordingConnection::new(1);

        router.on_connect(&handle(&conn));

        assert_eq!(
            conn.json_frames(),
            vec![json!({"type":"system","message":GREETING,"timestamp":"12:34:56"})]
        );
    }

    #[test]
    fn test_set_username_replies_and_broadcasts_user_list() {
        // Arrange
        let router = router();
        let alice = RecordingConnection::new(1);
        set_name(&router, &alice, "alice");
        alice.clear();
        let bob = RecordingConnection::new(2);

        // Act
        set_name(&router, &bob, "  bob  ");

        // Assert – bob: confirmation then list; alice: list only
        assert_eq!(
            bob.json_frames(),
            vec![
                json!({"type":"system","message":"Username set to: bob","timestamp":"12:34:56"}),
                json!({"type":"userList","users":["alice","bob"]}),
            ]
        );
        assert_eq!(
            alice.json_frames(),
            vec![json!({"type":"userList","users":["alice","bob"]})]
        );
    }

    #[test]
    fn test_set_username_whitespace_only_is_rejected_without_state_change() {
        let router = router();
        let conn = RecordingConnection::new(1);

        set_name(&router, &conn, "   ");

        assert_eq!(only_error(&conn), "Username cannot be empty");
        assert!(router.registry().is_empty());
    }

    #[test]
    fn test_set_username_taken_is_rejected() {
        let router = router();
        let (_alice, _bob) = alice_and_bob(&router);
        let intruder = RecordingConnection::new(3);

        set_name(&router, &intruder, "alice");

        assert_eq!(only_error(&intruder), "Username already taken");
        assert_eq!(router.registry().username_of(ConnectionId(3)), None);
    }

    #[test]
    fn test_set_username_rename_frees_old_name() {
        let router = router();
        let (alice, bob) = alice_and_bob(&router);

        set_name(&router, &alice, "alicia");

        assert_eq!(
            bob.frames_of_type("userList"),
            vec![json!({"type":"userList","users":["alicia","bob"]})]
        );
        assert!(router.registry().lookup("alice").is_none());
    }

    #[test]
    fn test_private_message_round_trip() {
        // Arrange
        let router = router();
        let (alice, bob) = alice_and_bob(&router);

        // Act
        router.on_frame(
            &handle(&alice),
            r#"{"type":"privateMessage","to":"bob","message":"hi"}"#,
        );

        // Assert – one copy each, identical timestamps
        let expected = |is_sent: bool| {
            json!({
                "type": "privateMessage",
                "from": "alice",
                "to": "bob",
                "message": "hi",
                "timestamp": "12:34:56",
                "isSent": is_sent
            })
        };
        assert_eq!(bob.json_frames(), vec![expected(false)]);
        assert_eq!(alice.json_frames(), vec![expected(true)]);
    }

    #[test]
    fn test_private_message_pair_shares_one_timestamp() {
        // Arrange – a clock that never returns the same value twice
        struct TickingClock(std::sync::atomic::AtomicU32);
        impl Clock for TickingClock {
            fn timestamp(&self) -> String {
                let n = self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                format!("00:00:{:02}", n % 60)
            }
        }
        let router = NamedRouter::new(
            Arc::new(IdentityRegistry::new()),
            Arc::new(TickingClock(Default::default())),
        );
        let (alice, bob) = alice_and_bob(&router);

        // Act
        router.on_frame(
            &handle(&alice),
            r#"{"type":"privateMessage","to":"bob","message":"hi"}"#,
        );

        // Assert
        let received = &bob.json_frames()[0];
        let echoed = &alice.json_frames()[0];
        assert_eq!(received["timestamp"], echoed["timestamp"]);
    }

    #[test]
    fn test_private_message_to_unknown_user_reaches_nobody_else() {
        // Arrange – a Named bystander that must never be written to
        let router = router();
        let (alice, bob) = alice_and_bob(&router);
        let mut bystander = MockConn::new();
        bystander.expect_id().return_const(ConnectionId(9));
        bystander.expect_is_open().return_const(true);
        bystander.expect_send_text().times(1).returning(|_| Ok(())); // its own userList
        let bystander: ConnectionRef = Arc::new(bystander);
        router
            .registry()
            .register(Username::parse("dave").unwrap(), &bystander)
            .unwrap();
        router.broadcast_user_list();
        alice.clear();
        bob.clear();

        // Act
        router.on_frame(
            &handle(&alice),
            r#"{"type":"privateMessage","to":"carol","message":"hi"}"#,
        );

        // Assert
        assert_eq!(only_error(&alice), "User carol not found");
        assert!(bob.frames().is_empty());
    }

    #[test]
    fn test_private_message_from_anonymous_is_rejected() {
        let router = router();
        let (_alice, bob) = alice_and_bob(&router);
        let anon = RecordingConnection::new(7);

        router.on_frame(
            &handle(&anon),
            r#"{"type":"privateMessage","to":"bob","message":"hi"}"#,
        );

        assert_eq!(only_error(&anon), "Please set your username first");
        assert!(bob.frames().is_empty());
    }

    #[test]
    fn test_private_message_to_closed_recipient_is_dropped_silently() {
        let router = router();
        let (alice, bob) = alice_and_bob(&router);
        bob.close();

        router.on_frame(
            &handle(&alice),
            r#"{"type":"privateMessage","to":"bob","message":"hi"}"#,
        );

        // The sender still gets its echo and no error.
        assert_eq!(alice.frames_of_type("privateMessage").len(), 1);
        assert!(alice.frames_of_type("error").is_empty());
    }

    #[test]
    fn test_get_user_list_works_for_anonymous() {
        let router = router();
        let (_alice, _bob) = alice_and_bob(&router);
        let anon = RecordingConnection::new(7);

        router.on_frame(&handle(&anon), r#"{"type":"getUserList"}"#);

        assert_eq!(
            anon.json_frames(),
            vec![json!({"type":"userList","users":["alice","bob"]})]
        );
    }

    #[test]
    fn test_unknown_type_gets_unknown_message_type() {
        let router = router();
        let conn = RecordingConnection::new(1);

        router.on_frame(&handle(&conn), r#"{"type":"shout","message":"hey"}"#);

        assert_eq!(only_error(&conn), "Unknown message type");
    }

    #[test]
    fn test_malformed_frames_get_invalid_message_format() {
        for frame in [
            "not json",
            "{}",
            r#"{"type":42}"#,
            r#"{"type":"setUsername"}"#,
            r#"{"type":"privateMessage","to":"bob"}"#,
        ] {
            let router = router();
            let conn = RecordingConnection::new(1);

            router.on_frame(&handle(&conn), frame);

            assert_eq!(only_error(&conn), "Invalid message format", "frame {frame:?}");
        }
    }

    #[test]
    fn test_disconnect_of_named_broadcasts_once_to_each_remaining() {
        // Arrange
        let router = router();
        let (alice, bob) = alice_and_bob(&router);
        let carol = RecordingConnection::new(3);
        set_name(&router, &carol, "carol");
        alice.clear();
        bob.clear();

        // Act
        router.on_disconnect(&handle(&carol));

        // Assert
        let expected = vec![json!({"type":"userList","users":["alice","bob"]})];
        assert_eq!(alice.json_frames(), expected);
        assert_eq!(bob.json_frames(), expected);
        assert!(carol.frames_of_type("userList").len() == 1, "only its own join broadcast");
    }

    #[test]
    fn test_disconnect_of_anonymous_broadcasts_nothing() {
        let router = router();
        let (alice, bob) = alice_and_bob(&router);
        let anon = RecordingConnection::new(7);

        router.on_disconnect(&handle(&anon));

        assert!(alice.frames().is_empty());
        assert!(bob.frames().is_empty());
    }

    #[test]
    fn test_user_list_after_churn_matches_named_set() {
        // Arrange
        let router = router();
        let conns: Vec<_> = (0..5).map(RecordingConnection::new).collect();
        for (i, conn) in conns.iter().enumerate() {
            set_name(&router, conn, &format!("user{i}"));
        }

        // Act – two leave, one renames
        router.on_disconnect(&handle(&conns[1]));
        router.on_disconnect(&handle(&conns[3]));
        set_name(&router, &conns[4], "zed");
        conns[0].clear();
        router.on_frame(&handle(&conns[0]), r#"{"type":"getUserList"}"#);

        // Assert
        assert_eq!(
            conns[0].json_frames(),
            vec![json!({"type":"userList","users":["user0","user2","zed"]})]
        );
    }

    /// Records like `RecordingConnection`, but once armed it parks the first
    /// `userList` send until the test releases it.
    struct GatedConnection {
        inner: Arc<RecordingConnection>,
        armed: AtomicBool,
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl Connection for GatedConnection {
        fn id(&self) -> ConnectionId {
            self.inner.id()
        }

        fn is_open(&self) -> bool {
            self.inner.is_open()
        }

        fn send_text(&self, frame: String) -> Result<(), SendError> {
            if frame.contains(r#""userList""#) && self.armed.swap(false, Ordering::SeqCst) {
                self.entered.lock().unwrap().send(()).unwrap();
                let _ = self
                    .release
                    .lock()
                    .unwrap()
                    .recv_timeout(Duration::from_secs(5));
            }
            self.inner.send_text(frame)
        }

        fn close(&self) {
            self.inner.close()
        }
    }

    fn join_in_background(
        router: &Arc<NamedRouter>,
        id: u64,
        name: &'static str,
    ) -> thread::JoinHandle<()> {
        let router = Arc::clone(router);
        thread::spawn(move || {
            let conn = RecordingConnection::new(id);
            router.on_frame(
                &handle(&conn),
                &json!({"type":"setUsername","username":name}).to_string(),
            );
        })
    }

    #[test]
    fn test_concurrent_joins_leave_latest_user_list_last() {
        // Arrange – alice is Named; her next userList send will stall
        let router = Arc::new(router());
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let alice_inbox = RecordingConnection::new(1);
        let alice = Arc::new(GatedConnection {
            inner: Arc::clone(&alice_inbox),
            armed: AtomicBool::new(false),
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        });
        router.on_frame(
            &(Arc::clone(&alice) as ConnectionRef),
            r#"{"type":"setUsername","username":"alice"}"#,
        );
        alice.armed.store(true, Ordering::SeqCst);

        // Act – bob's broadcast is parked on alice while carol joins
        let bob = join_in_background(&router, 2, "bob");
        entered_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("bob's broadcast never reached alice");
        let carol = join_in_background(&router, 3, "carol");
        thread::sleep(Duration::from_millis(50));
        release_tx.send(()).unwrap();
        bob.join().expect("bob thread panicked");
        carol.join().expect("carol thread panicked");

        // Assert
        let lists = alice_inbox.frames_of_type("userList");
        assert_eq!(
            lists.last(),
            Some(&json!({"type":"userList","users":["alice","bob","carol"]})),
            "alice's final user list is stale: {lists:?}"
        );
    }
}
