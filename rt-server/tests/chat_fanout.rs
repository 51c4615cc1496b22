mod common;

use common::{packet_with, TestClient, TestServer};
use rt_proto::{
    CreateRoomPayload, JoinRoomPayload, OpCode, Payload, RoomChatPayload, RoomChatReceivedPayload,
    RoomInfo,
};

fn login(client: &mut TestClient, username: &str) {
    let creds = rt_proto::LoginPayload { username: username.into(), password: "pw".into() };
    client.send_tcp(&packet_with(OpCode::RegisterRequest, creds.clone()));
    let _ = client.recv_tcp();
    client.send_tcp(&packet_with(OpCode::LoginRequest, creds));
    let _ = client.recv_tcp();
}

#[test]
fn a_chat_message_reaches_every_member_of_the_room() {
    let server = TestServer::spawn();

    let mut host = TestClient::connect(&server);
    login(&mut host, "alice");
    host.send_tcp(&packet_with(
        OpCode::CreateRoom,
        CreateRoomPayload {
            room_name: "lounge".into(),
            max_players: 4,
            difficulty: 1.0,
            speed: 1.0,
            level_id: 1,
            seed: 0,
            duration: 0,
        },
    ));

    let mut guest = TestClient::connect(&server);
    login(&mut guest, "bob");
    guest.send_tcp(&rt_proto::Packet::new(OpCode::ListRooms));
    let mut listing = guest.recv_tcp_matching(OpCode::RoomList);
    let _count = listing.read_pod::<u32>().unwrap();
    let room = RoomInfo::decode(&mut listing).unwrap();

    guest.send_tcp(&packet_with(OpCode::JoinRoom, JoinRoomPayload { room_id: room.room_id, is_spectator: 0 }));
    let _ = guest.recv_tcp_matching(OpCode::JoinRoom);

    guest.send_tcp(&packet_with(OpCode::RoomChatSent, RoomChatPayload { message: "hello room".into() }));

    let mut host_copy = host.recv_tcp_matching(OpCode::RoomChatReceived);
    let mut guest_copy = guest.recv_tcp_matching(OpCode::RoomChatReceived);

    let host_msg = RoomChatReceivedPayload::decode(&mut host_copy).unwrap();
    let guest_msg = RoomChatReceivedPayload::decode(&mut guest_copy).unwrap();

    assert_eq!(host_msg.username, "bob");
    assert_eq!(host_msg.message, "hello room");
    assert_eq!(guest_msg.username, "bob");
    assert_eq!(guest_msg.message, "hello room");
}
