mod common;

use common::{packet_with, TestClient, TestServer};
use rt_proto::{
    BooleanPayload, CreateRoomPayload, EntitySpawnPayload, JoinRoomPayload, OpCode, Payload,
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
fn a_spectator_can_join_a_room_that_is_already_in_game() {
    let server = TestServer::spawn();

    let mut host = TestClient::connect(&server);
    login(&mut host, "solo");
    host.send_tcp(&packet_with(
        OpCode::CreateRoom,
        CreateRoomPayload {
            room_name: "running".into(),
            max_players: 1,
            difficulty: 1.0,
            speed: 1.0,
            level_id: 1,
            seed: 0,
            duration: 0,
        },
    ));
    host.send_tcp(&packet_with(OpCode::SetReady, SetReadyPayload { is_ready: 1 }));
    let mut host_spawn = host.recv_tcp_matching(OpCode::EntitySpawn);
    let avatar = EntitySpawnPayload::decode(&mut host_spawn).unwrap();

    let mut spectator = TestClient::connect(&server);
    login(&mut spectator, "watcher");
    spectator.send_tcp(&rt_proto::Packet::new(OpCode::ListRooms));
    let mut listing = spectator.recv_tcp_matching(OpCode::RoomList);
    let _count = listing.read_pod::<u32>().unwrap();
    let room = RoomInfo::decode(&mut listing).unwrap();
    assert_eq!(room.in_game, 1);

    spectator.send_tcp(&packet_with(
        OpCode::JoinRoom,
        JoinRoomPayload { room_id: room.room_id, is_spectator: 1 },
    ));

    let mut join_ack = spectator.recv_tcp_matching(OpCode::JoinRoom);
    let ack = BooleanPayload::decode(&mut join_ack).unwrap();
    assert_eq!(ack.status, 1);

    let start = spectator.recv_tcp_matching(OpCode::StartGame);
    assert_eq!(start.header.op_code, OpCode::StartGame);

    let mut resync = spectator.recv_tcp_matching(OpCode::EntitySpawn);
    let resynced = EntitySpawnPayload::decode(&mut resync).unwrap();
    assert_eq!(resynced.net_id, avatar.net_id);
}
