//! Routing tests for the central match loop.
//!
//! These drive `run_match_loop` directly over channels, with the
//! in-memory backend standing in for the room store: no sockets, just
//! commands in and encoded frames out.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;

use referee_core::Action;
use referee_protocol::Inbound;
use referee_server::backend::{Backend, MemoryBackend};
use referee_server::match_task::run_match_loop;
use referee_server::types::{
    ConnId, ConnectionEntry, ConnectionRegistry, MatchCmd, MatchTx, OutboundRx,
};

const ROOM: u64 = 7;
const CREATOR: u64 = 10;
const CHALLENGER: u64 = 20;

struct Harness {
    match_tx: MatchTx,
    clients: ConnectionRegistry,
    backend: Arc<MemoryBackend>,
}

impl Harness {
    async fn new() -> Self {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_room(ROOM, "3x3_fair", CREATOR, "alice");
        backend.add_challenger(ROOM, CHALLENGER, "bob");

        let clients: ConnectionRegistry =
            Arc::new(tokio::sync::RwLock::new(Default::default()));
        let (match_tx, match_rx) = mpsc::unbounded_channel();

        let clients_clone = clients.clone();
        let backend_clone: Arc<dyn Backend> = backend.clone();
        tokio::spawn(async move {
            run_match_loop(match_rx, clients_clone, backend_clone).await;
        });

        Harness {
            match_tx,
            clients,
            backend,
        }
    }

    /// Register a connection and attach it to the room.
    async fn connect(&self, conn: ConnId, user: u64) -> OutboundRx {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        {
            let mut guard = self.clients.write().await;
            guard.insert(
                conn,
                ConnectionEntry {
                    user_id: user,
                    room_id: ROOM,
                    out_tx,
                },
            );
        }
        self.match_tx
            .send(MatchCmd::Attach {
                conn,
                user,
                room: ROOM,
            })
            .unwrap();
        out_rx
    }

    fn send(&self, conn: ConnId, user: u64, action: Action) {
        self.match_tx
            .send(MatchCmd::Frame {
                conn,
                user,
                room: ROOM,
                inbound: Inbound::Action(action),
            })
            .unwrap();
    }

    fn chat(&self, conn: ConnId, user: u64, text: &str) {
        self.match_tx
            .send(MatchCmd::Frame {
                conn,
                user,
                room: ROOM,
                inbound: Inbound::Chat(text.to_string()),
            })
            .unwrap();
    }
}

async fn recv_json(rx: &mut OutboundRx) -> Value {
    let frame = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for a frame")
        .expect("channel closed");
    serde_json::from_str(&frame).unwrap()
}

fn marks_on_board(state: &Value) -> usize {
    state["board"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|row| row.as_array().unwrap())
        .filter(|cell| cell.as_str() != Some(""))
        .count()
}

#[tokio::test]
async fn attaching_both_players_broadcasts_snapshots() {
    let h = Harness::new().await;

    let mut creator_rx = h.connect(ConnId(1), CREATOR).await;
    let first = recv_json(&mut creator_rx).await;
    assert_eq!(first["type"], "gameState");
    assert_eq!(first["status"], "round1");
    assert_eq!(first["currentTurn"], 0);
    assert_eq!(first["playersInfo"].as_array().unwrap().len(), 1);
    assert_eq!(first["playersInfo"][0]["nickName"], "alice");

    let mut challenger_rx = h.connect(ConnId(2), CHALLENGER).await;

    // The creator hears about the challenger coming online, then both
    // get the seated snapshot.
    let presence = recv_json(&mut creator_rx).await;
    assert_eq!(presence["type"], "onlineStatus");
    assert_eq!(presence["userID"], CHALLENGER);
    assert_eq!(presence["isOnline"], true);

    let seated = recv_json(&mut creator_rx).await;
    assert_eq!(seated["type"], "gameState");
    assert_eq!(seated["playersInfo"].as_array().unwrap().len(), 2);
    let turn = seated["currentTurn"].as_u64().unwrap();
    assert!(turn == CREATOR || turn == CHALLENGER);

    let seated_too = recv_json(&mut challenger_rx).await;
    assert_eq!(seated_too, seated);
}

#[tokio::test]
async fn marks_produce_fresh_snapshots_for_everyone() {
    let h = Harness::new().await;
    let mut creator_rx = h.connect(ConnId(1), CREATOR).await;
    let mut challenger_rx = h.connect(ConnId(2), CHALLENGER).await;

    recv_json(&mut creator_rx).await; // initial state
    recv_json(&mut creator_rx).await; // presence
    let seated = recv_json(&mut creator_rx).await;
    recv_json(&mut challenger_rx).await;

    let turn = seated["currentTurn"].as_u64().unwrap();
    let (conn, user) = if turn == CREATOR {
        (ConnId(1), CREATOR)
    } else {
        (ConnId(2), CHALLENGER)
    };

    h.send(conn, user, Action::MarkCell { x: 1, y: 1 });

    let after = recv_json(&mut creator_rx).await;
    assert_eq!(after["type"], "gameState");
    assert_eq!(marks_on_board(&after), 1);
    assert_eq!(after["currentTurn"].as_u64().unwrap(), if turn == CREATOR {
        CHALLENGER
    } else {
        CREATOR
    });
    assert_eq!(recv_json(&mut challenger_rx).await, after);
}

#[tokio::test]
async fn action_errors_reach_only_the_offender() {
    let h = Harness::new().await;
    let mut creator_rx = h.connect(ConnId(1), CREATOR).await;
    let mut challenger_rx = h.connect(ConnId(2), CHALLENGER).await;

    recv_json(&mut creator_rx).await;
    recv_json(&mut creator_rx).await;
    let seated = recv_json(&mut creator_rx).await;
    recv_json(&mut challenger_rx).await;

    // Whoever is *not* on turn tries to mark.
    let turn = seated["currentTurn"].as_u64().unwrap();
    let (conn, user, off_rx) = if turn == CREATOR {
        (ConnId(2), CHALLENGER, &mut challenger_rx)
    } else {
        (ConnId(1), CREATOR, &mut creator_rx)
    };

    h.send(conn, user, Action::MarkCell { x: 0, y: 0 });

    let err = recv_json(off_rx).await;
    assert_eq!(err["error"], "Not your turn");

    // The other participant sees nothing until the next broadcast;
    // a chat line proves the error was not fanned out.
    h.chat(conn, user, "oops");
    let quiet_rx = if turn == CREATOR {
        &mut creator_rx
    } else {
        &mut challenger_rx
    };
    let next = recv_json(quiet_rx).await;
    assert_eq!(next["type"], "chatMessage");
    assert_eq!(next["message"], "oops");
    assert_eq!(next["from"], user);
}

#[tokio::test]
async fn chat_is_stamped_and_relayed_to_the_room() {
    let h = Harness::new().await;
    let mut creator_rx = h.connect(ConnId(1), CREATOR).await;
    let mut challenger_rx = h.connect(ConnId(2), CHALLENGER).await;

    recv_json(&mut creator_rx).await;
    recv_json(&mut creator_rx).await;
    recv_json(&mut creator_rx).await;
    recv_json(&mut challenger_rx).await;

    h.chat(ConnId(2), CHALLENGER, "good luck");

    for rx in [&mut creator_rx, &mut challenger_rx] {
        let frame = recv_json(rx).await;
        assert_eq!(frame["type"], "chatMessage");
        assert_eq!(frame["message"], "good luck");
        assert_eq!(frame["from"], CHALLENGER);
        assert!(frame["timestamp"].as_str().unwrap().contains('T'));
    }
}

#[tokio::test]
async fn detach_notifies_the_opponent_once() {
    let h = Harness::new().await;
    let mut creator_rx = h.connect(ConnId(1), CREATOR).await;
    let mut challenger_rx = h.connect(ConnId(2), CHALLENGER).await;

    recv_json(&mut creator_rx).await;
    recv_json(&mut creator_rx).await;
    recv_json(&mut creator_rx).await;
    recv_json(&mut challenger_rx).await;

    // Challenger's socket goes away but the match lives on.
    {
        let mut guard = h.clients.write().await;
        guard.remove(&ConnId(2));
    }
    h.match_tx
        .send(MatchCmd::Detach {
            conn: ConnId(2),
            user: CHALLENGER,
            room: ROOM,
        })
        .unwrap();

    let presence = recv_json(&mut creator_rx).await;
    assert_eq!(presence["type"], "onlineStatus");
    assert_eq!(presence["userID"], CHALLENGER);
    assert_eq!(presence["isOnline"], false);

    // A duplicate detach is a no-op; the next frame the creator sees
    // is their own chat echo.
    h.match_tx
        .send(MatchCmd::Detach {
            conn: ConnId(2),
            user: CHALLENGER,
            room: ROOM,
        })
        .unwrap();
    h.chat(ConnId(1), CREATOR, "still there?");
    let next = recv_json(&mut creator_rx).await;
    assert_eq!(next["type"], "chatMessage");
}

#[tokio::test]
async fn reconnect_rebinds_without_touching_state() {
    let h = Harness::new().await;
    let mut creator_rx = h.connect(ConnId(1), CREATOR).await;
    let mut challenger_rx = h.connect(ConnId(2), CHALLENGER).await;

    recv_json(&mut creator_rx).await;
    recv_json(&mut creator_rx).await;
    let seated = recv_json(&mut creator_rx).await;
    recv_json(&mut challenger_rx).await;

    // Challenger drops and comes back on a new connection.
    {
        let mut guard = h.clients.write().await;
        guard.remove(&ConnId(2));
    }
    h.match_tx
        .send(MatchCmd::Detach {
            conn: ConnId(2),
            user: CHALLENGER,
            room: ROOM,
        })
        .unwrap();
    recv_json(&mut creator_rx).await; // offline notice

    let mut challenger_rx = h.connect(ConnId(3), CHALLENGER).await;
    let online = recv_json(&mut creator_rx).await;
    assert_eq!(online["type"], "onlineStatus");
    assert_eq!(online["isOnline"], true);

    let restored = recv_json(&mut challenger_rx).await;
    assert_eq!(restored["type"], "gameState");
    assert_eq!(restored["currentTurn"], seated["currentTurn"]);
    assert_eq!(restored["playersInfo"], seated["playersInfo"]);
}

#[tokio::test]
async fn actions_for_unknown_rooms_are_errors() {
    let h = Harness::new().await;
    let (out_tx, mut out_rx) = mpsc::unbounded_channel();
    {
        let mut guard = h.clients.write().await;
        guard.insert(
            ConnId(9),
            ConnectionEntry {
                user_id: 99,
                room_id: 404,
                out_tx,
            },
        );
    }

    h.match_tx
        .send(MatchCmd::Frame {
            conn: ConnId(9),
            user: 99,
            room: 404,
            inbound: Inbound::Action(Action::Bribe),
        })
        .unwrap();

    let err = recv_json(&mut out_rx).await;
    assert_eq!(err["error"], "Game not found");
}

#[tokio::test]
async fn finished_rooms_refuse_new_matches() {
    let h = Harness::new().await;
    h.backend.finalize_room(ROOM).await.unwrap();

    // A stale session can still carry the room id past membership
    // resolution; the attach itself must refuse a finished room.
    let mut rx = h.connect(ConnId(1), CREATOR).await;
    let refusal = recv_json(&mut rx).await;
    assert_eq!(refusal["error"], "Game not found");

    // No match was registered for the room.
    h.send(ConnId(1), CREATOR, Action::Bribe);
    let err = recv_json(&mut rx).await;
    assert_eq!(err["error"], "Game not found");
}

#[tokio::test]
async fn stale_socket_teardown_does_not_mask_a_reconnect() {
    let h = Harness::new().await;
    let mut creator_rx = h.connect(ConnId(1), CREATOR).await;
    let mut challenger_rx = h.connect(ConnId(2), CHALLENGER).await;

    recv_json(&mut creator_rx).await;
    recv_json(&mut creator_rx).await;
    recv_json(&mut creator_rx).await;
    recv_json(&mut challenger_rx).await;

    // The challenger's replacement socket attaches before the old
    // socket's teardown is processed.
    {
        let mut guard = h.clients.write().await;
        guard.remove(&ConnId(2));
    }
    let mut challenger_rx = h.connect(ConnId(3), CHALLENGER).await;
    recv_json(&mut challenger_rx).await; // restored snapshot

    // No offline transition happened, so the creator sees the state
    // broadcast with no presence frame in front of it.
    let re = recv_json(&mut creator_rx).await;
    assert_eq!(re["type"], "gameState");

    // The old socket's late teardown is superseded and ignored.
    h.match_tx
        .send(MatchCmd::Detach {
            conn: ConnId(2),
            user: CHALLENGER,
            room: ROOM,
        })
        .unwrap();
    h.chat(ConnId(1), CREATOR, "ping");
    let next = recv_json(&mut creator_rx).await;
    assert_eq!(next["type"], "chatMessage");
    assert_eq!(recv_json(&mut challenger_rx).await["type"], "chatMessage");
}

#[tokio::test]
async fn second_socket_for_an_online_user_sends_no_presence() {
    let h = Harness::new().await;
    let mut creator_rx = h.connect(ConnId(1), CREATOR).await;
    let mut challenger_rx = h.connect(ConnId(2), CHALLENGER).await;

    recv_json(&mut creator_rx).await;
    recv_json(&mut creator_rx).await;
    recv_json(&mut creator_rx).await;
    recv_json(&mut challenger_rx).await;

    // The challenger opens a second socket while the first is alive.
    let mut extra_rx = h.connect(ConnId(3), CHALLENGER).await;
    recv_json(&mut extra_rx).await;

    // Already online: the creator gets only the snapshot, no
    // onlineStatus frame.
    let frame = recv_json(&mut creator_rx).await;
    assert_eq!(frame["type"], "gameState");
}

#[tokio::test]
async fn finalized_rooms_stop_resolving_memberships() {
    let h = Harness::new().await;

    assert!(h.backend.resolve_membership(CREATOR).await.is_ok());
    assert!(h.backend.resolve_membership(CHALLENGER).await.is_ok());

    h.backend.finalize_room(ROOM).await.unwrap();

    assert!(h.backend.resolve_membership(CREATOR).await.is_err());
    assert!(h.backend.resolve_membership(CHALLENGER).await.is_err());
    // The record itself survives for later inspection.
    assert_eq!(h.backend.room_info(ROOM).await.unwrap().state, "finished");
}
