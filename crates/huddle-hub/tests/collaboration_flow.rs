//! End-to-end hub scenario over raw wire frames: two users collaborate in
//! a project, access is revoked mid-session, and a departure is announced.
//! Everything goes through `handle_frame`, so frame parsing, dispatch,
//! gating, and fan-out are exercised together.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use huddle_core::{AccessGate, EphemeralStore, ProjectRole, Result, RoomKey, TaskContext, UserId};
use huddle_hub::{ConnectionId, Hub};
use huddle_state::MemoryStore;

#[derive(Default)]
struct ScriptedGate {
    roles: Mutex<HashMap<(UserId, i64), ProjectRole>>,
    tasks: Mutex<HashMap<i64, i64>>,
}

impl ScriptedGate {
    fn grant(&self, user_id: UserId, project_id: i64, role: ProjectRole) {
        self.roles
            .lock()
            .unwrap()
            .insert((user_id, project_id), role);
    }

    fn revoke(&self, user_id: UserId, project_id: i64) {
        self.roles.lock().unwrap().remove(&(user_id, project_id));
    }

    fn put_task(&self, task_id: i64, project_id: i64) {
        self.tasks.lock().unwrap().insert(task_id, project_id);
    }
}

#[async_trait]
impl AccessGate for ScriptedGate {
    async fn project_role(&self, user_id: UserId, project_id: i64) -> Result<Option<ProjectRole>> {
        Ok(self
            .roles
            .lock()
            .unwrap()
            .get(&(user_id, project_id))
            .copied())
    }

    async fn task_access(&self, user_id: UserId, task_id: i64) -> Result<Option<TaskContext>> {
        let project_id = match self.tasks.lock().unwrap().get(&task_id) {
            Some(p) => *p,
            None => return Ok(None),
        };
        Ok(self
            .project_role(user_id, project_id)
            .await?
            .map(|role| TaskContext {
                task_id,
                project_id,
                role,
            }))
    }
}

async fn attach(hub: &Hub, user_id: UserId) -> (ConnectionId, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let conn = hub.connect(user_id, tx).await;
    (conn, rx)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

#[tokio::test]
async fn test_full_collaboration_session() {
    let gate = Arc::new(ScriptedGate::default());
    gate.grant(1, 42, ProjectRole::Owner);
    gate.grant(2, 42, ProjectRole::Member);
    gate.put_task(9, 42);
    let store = Arc::new(MemoryStore::new());
    let hub = Hub::new(gate.clone(), store.clone());

    let (alice, mut alice_rx) = attach(&hub, 1).await;
    let (bob, mut bob_rx) = attach(&hub, 2).await;

    // Both join the project over the wire.
    hub.handle_frame(alice, r#"{"event":"join-project","data":{"projectId":42}}"#)
        .await;
    hub.handle_frame(bob, r#"{"event":"join-project","data":{"projectId":42}}"#)
        .await;

    let alice_frames = drain(&mut alice_rx);
    assert!(alice_frames
        .iter()
        .any(|f| f.contains(r#""event":"project-joined"#)));
    // Bob's arrival is announced to Alice.
    assert!(alice_frames
        .iter()
        .any(|f| f.contains(r#""event":"user-online"#) && f.contains(r#""userId":2"#)));
    drain(&mut bob_rx);

    // Alice updates a task; Bob sees it, Alice gets no echo.
    hub.handle_frame(
        alice,
        r#"{"event":"task-updated","data":{"projectId":42,"taskId":9,"status":"done"}}"#,
    )
    .await;
    let bob_frames = drain(&mut bob_rx);
    assert_eq!(bob_frames.len(), 1);
    assert!(bob_frames[0].contains(r#""event":"task-updated"#));
    assert!(bob_frames[0].contains(r#""actor":1"#));
    assert!(drain(&mut alice_rx).is_empty());

    // The write invalidated the snapshot and left an activity trail.
    assert_eq!(store.get("project:42").await, None);
    assert_eq!(store.lrange("activity:42", 0, -1).await.len(), 1);

    // Bob's membership is revoked; his very next event bounces and
    // nothing reaches Alice.
    gate.revoke(2, 42);
    hub.handle_frame(
        bob,
        r#"{"event":"new-message","data":{"projectId":42,"body":"still here?"}}"#,
    )
    .await;
    let bob_frames = drain(&mut bob_rx);
    assert_eq!(bob_frames.len(), 1);
    assert!(bob_frames[0].contains(r#""event":"error"#));
    assert!(drain(&mut alice_rx).is_empty());

    // Bob leaves; Alice is told he is gone.
    hub.handle_frame(bob, r#"{"event":"leave-project","data":{"projectId":42}}"#)
        .await;
    let alice_frames = drain(&mut alice_rx);
    assert!(alice_frames
        .iter()
        .any(|f| f.contains(r#""event":"user-offline"#) && f.contains(r#""userId":2"#)));
    assert_eq!(hub.rooms().members_of(RoomKey::Project(42)), vec![alice]);

    // Disconnects leave no trace.
    hub.disconnect(alice).await;
    hub.disconnect(bob).await;
    assert_eq!(hub.registry().connection_count(), 0);
    assert_eq!(hub.rooms().room_count(), 0);
}
