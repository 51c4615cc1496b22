mod common;

use std::time::Duration;

use common::{packet_with, TestClient, TestServer};
use rt_proto::{
    CreateRoomPayload, EntitySnapshotPayload, EntitySpawnPayload, InputPayload, OpCode, Payload,
    RoomSnapshotPayload, SetReadyPayload,
};

fn login(client: &mut TestClient, username: &str) {
    let creds = rt_proto::LoginPayload { username: username.into(), password: "pw".into() };
    client.send_tcp(&packet_with(OpCode::RegisterRequest, creds.clone()));
    let _ = client.recv_tcp();
    client.send_tcp(&packet_with(OpCode::LoginRequest, creds));
    let _ = client.recv_tcp();
}

#[test]
fn solo_room_starts_and_input_moves_the_avatar() {
    let server = TestServer::spawn();
    let mut client = TestClient::connect(&server);
    client.bind_udp();
    login(&mut client, "runner");

    let room = CreateRoomPayload {
        room_name: "solo".into(),
        max_players: 1,
        difficulty: 1.0,
        speed: 1.0,
        level_id: 1,
        seed: 0,
        duration: 0,
    };
    client.send_tcp(&packet_with(OpCode::CreateRoom, room));

    client.send_tcp(&packet_with(OpCode::SetReady, SetReadyPayload { is_ready: 1 }));

    // The room launches on the next tick, spawning one avatar reliably.
    let mut spawn_packet = client.recv_tcp_matching(OpCode::EntitySpawn);
    let spawn = EntitySpawnPayload::decode(&mut spawn_packet).unwrap();
    assert_eq!(spawn.entity_type, 1);

    // Drive the avatar to the right; the next unreliable snapshot should reflect the movement.
    client.send_tcp(&packet_with(OpCode::InputTick, InputPayload { input_mask: InputPayload::RIGHT }));

    let first = read_snapshot_for(&client, spawn.net_id);
    std::thread::sleep(Duration::from_millis(120));
    let second = read_snapshot_for(&client, spawn.net_id);

    assert!(second.position.x > first.position.x, "avatar should have moved right");
}

/// Reads unreliable snapshots off the UDP socket until one carries `net_id`'s entity.
fn read_snapshot_for(client: &TestClient, net_id: u32) -> EntitySnapshotPayload {
    loop {
        let mut packet = client.recv_udp();
        if packet.header.op_code != OpCode::RoomUpdate {
            continue;
        }
        let header = RoomSnapshotPayload::decode(&mut packet).unwrap();
        for _ in 0..header.entity_count {
            let entity = EntitySnapshotPayload::decode(&mut packet).unwrap();
            if entity.net_id == net_id {
                return entity;
            }
        }
    }
}
