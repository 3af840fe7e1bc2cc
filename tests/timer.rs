//! Black-box coverage of [`lora_link_controller::timer::TimerRegistry`]
//! from outside the crate, complementing its inline unit tests with
//! scenarios closer to how the link controller actually uses the table:
//! several concurrently armed deadlines, one stopped mid-flight.

use lora_link_controller::timer::TimerRegistry;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Deadline {
    Idle,
    JoinInterval,
    SendWaiting,
    RetryBackoff,
}

#[test]
fn independent_timers_fire_on_their_own_schedules() {
    let mut table: TimerRegistry<Deadline> = TimerRegistry::new(Deadline::Idle);

    let join = table.set(None, 90_000, Deadline::JoinInterval).unwrap();
    let send = table.set(None, 17_500, Deadline::SendWaiting).unwrap();
    table.start(join, 0);
    table.start(send, 0);

    let expired = table.tick(17_500);
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].context, Deadline::SendWaiting);

    // The send-waiting slot already fired and was cleared; a later tick
    // doesn't refire it, but the join timer is still pending.
    assert!(table.tick(17_600).is_empty());

    let expired = table.tick(90_000);
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].context, Deadline::JoinInterval);
}

#[test]
fn reusing_a_slot_after_stop_rearms_cleanly() {
    let mut table: TimerRegistry<Deadline> = TimerRegistry::new(Deadline::Idle);

    let id = table.set(None, 20_000, Deadline::RetryBackoff).unwrap();
    table.start(id, 0);
    table.stop(id);
    assert!(table.tick(20_000).is_empty());

    // Re-arm the same slot (as the link controller does across
    // repeated SendFailure -> RetryWaiting cycles) and confirm it
    // still fires on its new schedule.
    table.set(Some(id), 20_000, Deadline::RetryBackoff).unwrap();
    table.start(id, 20_000);
    assert!(table.tick(39_999).is_empty());
    assert_eq!(table.tick(40_000).len(), 1);
}
