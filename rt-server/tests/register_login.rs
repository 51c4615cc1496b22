mod common;

use common::{packet_with, TestClient, TestServer};
use rt_proto::{LoginPayload, LoginResponsePayload, OpCode, Payload};

#[test]
fn register_then_login_succeeds_and_wrong_password_is_rejected() {
    let server = TestServer::spawn();
    let mut client = TestClient::connect(&server);

    let creds = LoginPayload { username: "alice".into(), password: "hunter2".into() };
    client.send_tcp(&packet_with(OpCode::RegisterRequest, creds.clone()));
    let mut reply = client.recv_tcp();
    assert_eq!(reply.header.op_code, OpCode::RegisterResponse);
    let body = LoginResponsePayload::decode(&mut reply).unwrap();
    assert_eq!(body.success, 1);
    assert_eq!(body.username, "alice");

    // Registering the same username again is rejected.
    client.send_tcp(&packet_with(OpCode::RegisterRequest, creds.clone()));
    let mut reply = client.recv_tcp();
    let body = LoginResponsePayload::decode(&mut reply).unwrap();
    assert_eq!(body.success, 0);

    client.send_tcp(&packet_with(OpCode::LoginRequest, creds));
    let mut reply = client.recv_tcp();
    assert_eq!(reply.header.op_code, OpCode::LoginResponse);
    let body = LoginResponsePayload::decode(&mut reply).unwrap();
    assert_eq!(body.success, 1);

    let wrong = LoginPayload { username: "alice".into(), password: "wrong".into() };
    client.send_tcp(&packet_with(OpCode::LoginRequest, wrong));
    let mut reply = client.recv_tcp();
    let body = LoginResponsePayload::decode(&mut reply).unwrap();
    assert_eq!(body.success, 0);
}
