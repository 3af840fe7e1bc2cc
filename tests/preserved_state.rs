//! Black-box coverage of the deep-sleep snapshot format: a host only ever
//! calls `save`/`load` against whatever RTC-retained memory it owns, so
//! these tests exercise that surface with a vars value representative of
//! a real deep-sleep handoff (joined, mid-retry-count, ISM2400 selected).

use lora_link_controller::link::LinkVars;
use lora_link_controller::preserved_state::{load, save, PreservedState, BLOB_LEN};

fn mid_session_vars() -> LinkVars {
    let mut vars = LinkVars::new(10);
    vars.ack_count = 128;
    vars.nak_count = 3;
    vars.using_ism2400 = true;
    vars.data_rate = 3;
    vars.unconfirmed_count = 0;
    vars
}

#[test]
fn a_realistic_snapshot_survives_a_save_load_cycle() {
    let mut mac_contexts = heapless::Vec::new();
    mac_contexts.extend_from_slice(&[0x5A; 96]).unwrap();
    let state = PreservedState {
        mac_contexts,
        link_vars: mid_session_vars(),
    };

    let mut blob = [0u8; BLOB_LEN];
    save(&state, &mut blob);

    let restored = load(&blob).expect("a freshly saved blob must load back");
    assert_eq!(restored.link_vars.ack_count, 128);
    assert!(restored.link_vars.using_ism2400);
    assert_eq!(restored.mac_contexts.as_slice(), &[0x5A; 96][..]);
}

#[test]
fn a_torn_write_across_the_body_is_rejected() {
    // Simulate a power loss mid-write: the magic made it out but the body
    // didn't, so the CRC must catch it even though the magic looks valid.
    let state = PreservedState {
        mac_contexts: heapless::Vec::new(),
        link_vars: mid_session_vars(),
    };
    let mut blob = [0u8; BLOB_LEN];
    save(&state, &mut blob);

    for byte in blob.iter_mut().skip(32).take(16) {
        *byte = 0xFF;
    }

    assert!(load(&blob).is_none());
}
