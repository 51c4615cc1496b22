mod common;

use common::{packet_with, TestClient, TestServer};
use rt_proto::{
    CreateRoomPayload, EntityDeathPayload, EntitySpawnPayload, JoinRoomPayload, OpCode, Payload,
    RoomInfo, SetReadyPayload,
};

fn login(client: &mut TestClient, username: &str) {
    let creds = rt_proto::LoginPayload { username: username.into(), password: "pw".into() };
    client.send_tcp(&packet_with(OpCode::RegisterRequest, creds.clone()));
    let _ = client.recv_tcp();
    client.send_tcp(&packet_with(OpCode::LoginRequest, creds));
    let _ = client.recv_tcp();
}

#[test]
fn disconnecting_a_player_mid_game_notifies_the_other_room_members() {
    let server = TestServer::spawn();

    let mut host = TestClient::connect(&server);
    login(&mut host, "host");
    host.send_tcp(&packet_with(
        OpCode::CreateRoom,
        CreateRoomPayload {
            room_name: "duo".into(),
            max_players: 2,
            difficulty: 1.0,
            speed: 1.0,
            level_id: 1,
            seed: 0,
            duration: 0,
        },
    ));

    let mut guest = TestClient::connect(&server);
    login(&mut guest, "guest");

    // Look up the room id through the room list rather than hard-coding it.
    guest.send_tcp(&rt_proto::Packet::new(OpCode::ListRooms));
    let mut listing = guest.recv_tcp_matching(OpCode::RoomList);
    let count = listing.read_pod::<u32>().unwrap();
    assert_eq!(count, 1);
    let room = RoomInfo::decode(&mut listing).unwrap();

    guest.send_tcp(&packet_with(OpCode::JoinRoom, JoinRoomPayload { room_id: room.room_id, is_spectator: 0 }));
    let join_ack = guest.recv_tcp_matching(OpCode::JoinRoom);
    assert_eq!(join_ack.header.op_code, OpCode::JoinRoom);

    host.send_tcp(&packet_with(OpCode::SetReady, SetReadyPayload { is_ready: 1 }));
    guest.send_tcp(&packet_with(OpCode::SetReady, SetReadyPayload { is_ready: 1 }));

    let mut host_spawn_a = host.recv_tcp_matching(OpCode::EntitySpawn);
    let mut host_spawn_b = host.recv_tcp_matching(OpCode::EntitySpawn);
    let _ = guest.recv_tcp_matching(OpCode::EntitySpawn);
    let _ = guest.recv_tcp_matching(OpCode::EntitySpawn);

    let spawn_a = EntitySpawnPayload::decode(&mut host_spawn_a).unwrap();
    let spawn_b = EntitySpawnPayload::decode(&mut host_spawn_b).unwrap();
    let net_ids = [spawn_a.net_id, spawn_b.net_id];

    drop(guest);

    let mut death_packet = host.recv_tcp_matching(OpCode::EntityDeath);
    let death = EntityDeathPayload::decode(&mut death_packet).unwrap();
    assert!(net_ids.contains(&death.net_id));
}
