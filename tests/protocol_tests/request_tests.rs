//! Request Code Tests

use vhost_user_emu::protocol::{Message, RequestCode, FLAG_REPLY, PAYLOAD_SIZE};

#[test]
fn test_wire_values() {
    assert_eq!(RequestCode::None as u32, 0);
    assert_eq!(RequestCode::GetFeatures as u32, 1);
    assert_eq!(RequestCode::SetFeatures as u32, 2);
    assert_eq!(RequestCode::SetOwner as u32, 3);
    assert_eq!(RequestCode::SetMemTable as u32, 5);
    assert_eq!(RequestCode::SetVringErr as u32, 14);
    assert_eq!(RequestCode::GetProtocolFeatures as u32, 15);
    assert_eq!(RequestCode::SetProtocolFeatures as u32, 16);
}

#[test]
fn test_from_u32_covers_defined_range() {
    for value in 0..=16u32 {
        let code = RequestCode::from_u32(value).expect("defined code");
        assert_eq!(code.as_u32(), value);
    }
    assert_eq!(RequestCode::from_u32(17), None);
    assert_eq!(RequestCode::from_u32(999), None);
    assert_eq!(RequestCode::from_u32(u32::MAX), None);
}

#[test]
fn test_names() {
    assert_eq!(RequestCode::GetFeatures.to_string(), "GET_FEATURES");
    assert_eq!(RequestCode::GetProtocolFeatures.name(), "GET_PROTOCOL_FEATURES");
    assert_eq!(Message::request(999u32).request_name(), "UNKNOWN(999)");
}

#[test]
fn test_only_vring_state_codes_carry_index_num() {
    let vring: Vec<RequestCode> = RequestCode::ALL
        .iter()
        .copied()
        .filter(|code| code.carries_vring_state())
        .collect();

    assert_eq!(
        vring,
        vec![
            RequestCode::SetVringNum,
            RequestCode::SetVringBase,
            RequestCode::GetVringBase
        ]
    );
}

#[test]
fn test_request_constructors() {
    let query = Message::request(RequestCode::GetFeatures);
    assert_eq!(query.flags, FLAG_REPLY);
    assert_eq!(query.size, 0);
    assert_eq!(query.payload.as_u64(), 0);
    assert!(query.is_reply());

    let set = Message::with_value(RequestCode::SetFeatures, 0x42);
    assert_eq!(set.size, PAYLOAD_SIZE);
    assert_eq!(set.payload.as_u64(), 0x42);
}
