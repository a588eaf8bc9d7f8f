//! Synchronization primitive tests
//!
//! Each scenario plays several tasks against one host-side `Kernel`. A
//! blocked call returns `Blocked`; once the task is dispatched again the
//! test repeats the call with the same deadline, as the `os` layer does.

#![cfg(all(feature = "sem", feature = "mutex", feature = "queue-set", feature = "notify"))]

mod common;

use common::*;
use rtcore::config::{CFG_MAX_OBJECTS, CFG_QUEUE_REGISTRY_SIZE};
use rtcore::{Deadline, NotifyAction, OsError, Queue, Timeout};

// ============ Mutex ============

#[test]
fn test_priority_inheritance_bounds_inversion() {
    let mut k = kernel();
    let low = spawn(&mut k, "low", 1);
    k.start().unwrap();

    let m = k.mutex_create(false).unwrap();
    k.mutex_lock(m, &mut Deadline::NO_WAIT).unwrap();

    let high = spawn(&mut k, "high", 3);
    assert_eq!(run(&mut k), Some(high));
    let mut d = k.deadline(Timeout::Forever);
    assert_eq!(k.mutex_lock(m, &mut d), Err(OsError::Blocked));

    // The holder runs at the waiter's priority
    assert_eq!(run(&mut k), Some(low));
    assert_eq!(prio_of(&k, low), 3);
    assert_eq!(k.task_priority_get(low), Ok(1));

    // A medium task cannot get in between
    let mid = spawn(&mut k, "mid", 2);
    assert!(!k.is_switch_pending());
    assert_eq!(run(&mut k), Some(low));

    k.mutex_unlock(m).unwrap();
    assert_eq!(prio_of(&k, low), 1);
    assert_eq!(run(&mut k), Some(high));
    assert_eq!(k.mutex_lock(m, &mut d), Ok(()));
    assert_eq!(k.mutex_holder(m), Ok(Some(high)));

    k.mutex_unlock(m).unwrap();
    k.delay(10).unwrap();
    assert_eq!(run(&mut k), Some(mid));
}

#[test]
fn test_inheritance_is_transitive_and_undone_on_timeout() {
    let mut k = kernel();
    let low = spawn(&mut k, "low", 1);
    k.start().unwrap();

    let a = k.mutex_create(false).unwrap();
    let b = k.mutex_create(false).unwrap();
    k.mutex_lock(a, &mut Deadline::NO_WAIT).unwrap();

    let mid = spawn(&mut k, "mid", 2);
    assert_eq!(run(&mut k), Some(mid));
    k.mutex_lock(b, &mut Deadline::NO_WAIT).unwrap();
    let mut mid_wait = k.deadline(Timeout::Forever);
    assert_eq!(k.mutex_lock(a, &mut mid_wait), Err(OsError::Blocked));
    assert_eq!(run(&mut k), Some(low));
    assert_eq!(prio_of(&k, low), 2);

    let high = spawn(&mut k, "high", 3);
    assert_eq!(run(&mut k), Some(high));
    let mut high_wait = k.deadline(Timeout::Ticks(5));
    assert_eq!(k.mutex_lock(b, &mut high_wait), Err(OsError::Blocked));

    // high -> b held by mid -> a held by low
    assert_eq!(run(&mut k), Some(low));
    assert_eq!(prio_of(&k, mid), 3);
    assert_eq!(prio_of(&k, low), 3);

    ticks(&mut k, 5);
    assert_eq!(k.current(), Some(high));
    assert_eq!(k.mutex_lock(b, &mut high_wait), Err(OsError::Timeout));
    assert_eq!(prio_of(&k, mid), 2);
    assert_eq!(prio_of(&k, low), 2);
    assert_eq!(k.mutex_holder(b), Ok(Some(mid)));
}

#[test]
fn test_mutex_misuse() {
    let mut k = kernel();
    let a = spawn(&mut k, "a", 5);
    let b = spawn(&mut k, "b", 3);
    k.start().unwrap();

    let m = k.mutex_create(false).unwrap();
    assert_eq!(k.mutex_unlock(m), Err(OsError::MutexNotOwner));
    k.mutex_lock(m, &mut Deadline::NO_WAIT).unwrap();
    assert_eq!(
        k.mutex_lock(m, &mut Deadline::NO_WAIT),
        Err(OsError::MutexOwner)
    );

    k.delay(1).unwrap();
    assert_eq!(run(&mut k), Some(b));
    assert_eq!(
        k.mutex_lock(m, &mut Deadline::NO_WAIT),
        Err(OsError::PendWouldBlock)
    );
    assert_eq!(k.mutex_unlock(m), Err(OsError::MutexNotOwner));
    assert_eq!(k.mutex_holder(m), Ok(Some(a)));

    let s = k.sem_create_binary().unwrap();
    assert_eq!(k.mutex_unlock(s), Err(OsError::ObjType));
}

#[test]
fn test_recursive_mutex_depth() {
    let mut k = kernel();
    spawn(&mut k, "t", 5);
    k.start().unwrap();

    let m = k.mutex_create(true).unwrap();
    for _ in 0..3 {
        k.mutex_lock(m, &mut Deadline::NO_WAIT).unwrap();
    }
    assert_eq!(k.mutex_depth(m), Ok(3));

    k.mutex_unlock(m).unwrap();
    k.mutex_unlock(m).unwrap();
    assert!(k.mutex_holder(m).unwrap().is_some());
    k.mutex_unlock(m).unwrap();
    assert_eq!(k.mutex_holder(m), Ok(None));
    assert_eq!(k.mutex_unlock(m), Err(OsError::MutexNotOwner));
}

#[test]
fn test_deleted_holder_passes_mutex_on() {
    let mut k = kernel();
    let low = spawn(&mut k, "low", 2);
    k.start().unwrap();

    let m = k.mutex_create(false).unwrap();
    k.mutex_lock(m, &mut Deadline::NO_WAIT).unwrap();

    let high = spawn(&mut k, "high", 5);
    run(&mut k);
    let mut d = k.deadline(Timeout::Forever);
    assert_eq!(k.mutex_lock(m, &mut d), Err(OsError::Blocked));
    assert_eq!(run(&mut k), Some(low));

    k.task_delete(low).unwrap();
    assert_eq!(run(&mut k), Some(high));
    assert_eq!(k.mutex_lock(m, &mut d), Ok(()));
    assert_eq!(k.mutex_holder(m), Ok(Some(high)));
}

// ============ Queue ============

#[test]
fn test_queue_fifo_and_bounds() {
    let mut k = kernel();
    spawn(&mut k, "t", 5);
    k.start().unwrap();

    let mut q: Queue<u32, 3> = Queue::create(&mut k).unwrap();
    for item in 1..=3 {
        q.send(&mut k, item, &mut Deadline::NO_WAIT).unwrap();
    }
    assert!(q.is_full());
    assert_eq!(q.send(&mut k, 4, &mut Deadline::NO_WAIT), Err(OsError::QFull));
    assert_eq!(q.peek(&k), Ok(1));
    assert_eq!(q.messages_waiting(), 3);

    for item in 1..=3 {
        assert_eq!(q.receive(&mut k, &mut Deadline::NO_WAIT), Ok(item));
    }
    assert_eq!(q.receive(&mut k, &mut Deadline::NO_WAIT), Err(OsError::QEmpty));
    assert_eq!(q.peek(&k), Err(OsError::QEmpty));
    assert_eq!(q.spaces_available(), 3);
}

#[test]
fn test_queue_send_to_front() {
    let mut k = kernel();
    spawn(&mut k, "t", 5);
    k.start().unwrap();

    let mut q: Queue<u32, 4> = Queue::create(&mut k).unwrap();
    q.send(&mut k, 1, &mut Deadline::NO_WAIT).unwrap();
    q.send(&mut k, 2, &mut Deadline::NO_WAIT).unwrap();
    q.send_to_front(&mut k, 0, &mut Deadline::NO_WAIT).unwrap();

    let drained: Vec<u32> = (0..3)
        .map(|_| q.receive(&mut k, &mut Deadline::NO_WAIT).unwrap())
        .collect();
    assert_eq!(drained, vec![0, 1, 2]);
}

#[test]
fn test_blocked_senders_wake_by_priority() {
    let mut k = kernel();
    let mut q: Queue<u32, 1> = Queue::create(&mut k).unwrap();
    q.send(&mut k, 0, &mut Deadline::NO_WAIT).unwrap();

    let s3 = spawn(&mut k, "s3", 3);
    let s7 = spawn(&mut k, "s7", 7);
    let rx = spawn(&mut k, "rx", 1);
    k.start().unwrap();

    let mut d7 = k.deadline(Timeout::Forever);
    assert_eq!(q.send(&mut k, 7, &mut d7), Err(OsError::Blocked));
    assert_eq!(run(&mut k), Some(s3));
    let mut d3 = k.deadline(Timeout::Forever);
    assert_eq!(q.send(&mut k, 3, &mut d3), Err(OsError::Blocked));
    assert_eq!(run(&mut k), Some(rx));

    assert_eq!(q.receive(&mut k, &mut Deadline::NO_WAIT), Ok(0));
    assert_eq!(run(&mut k), Some(s7));
    assert_eq!(q.send(&mut k, 7, &mut d7), Ok(()));
    k.delay(10).unwrap();
    assert_eq!(run(&mut k), Some(rx));

    assert_eq!(q.receive(&mut k, &mut Deadline::NO_WAIT), Ok(7));
    assert_eq!(run(&mut k), Some(s3));
    assert_eq!(q.send(&mut k, 3, &mut d3), Ok(()));
    k.delay(10).unwrap();
    assert_eq!(run(&mut k), Some(rx));
    assert_eq!(q.receive(&mut k, &mut Deadline::NO_WAIT), Ok(3));
}

#[test]
fn test_queue_receive_times_out() {
    let mut k = kernel();
    let t = spawn(&mut k, "t", 5);
    let other = spawn(&mut k, "other", 1);
    k.start().unwrap();

    let mut q: Queue<u8, 2> = Queue::create(&mut k).unwrap();
    let mut d = k.deadline(Timeout::Ticks(3));
    assert_eq!(q.receive(&mut k, &mut d), Err(OsError::Blocked));
    assert_eq!(run(&mut k), Some(other));

    ticks(&mut k, 2);
    assert_eq!(k.current(), Some(other));
    tick(&mut k);
    assert_eq!(k.current(), Some(t));
    assert_eq!(q.receive(&mut k, &mut d), Err(OsError::Timeout));
}

#[test]
fn test_item_arriving_on_timeout_tick_is_received() {
    let mut k = kernel();
    let t = spawn(&mut k, "t", 5);
    spawn(&mut k, "other", 1);
    k.start().unwrap();

    let mut q: Queue<u8, 2> = Queue::create(&mut k).unwrap();
    let mut d = k.deadline(Timeout::Ticks(3));
    assert_eq!(q.receive(&mut k, &mut d), Err(OsError::Blocked));
    run(&mut k);
    ticks(&mut k, 2);

    // The tick times the wait out, then an interrupt on the same tick sends
    let mut isr = k.isr();
    assert!(isr.tick());
    assert_eq!(q.send_from_isr(&mut isr, 9), Ok(false));
    assert!(isr.exit());
    assert_eq!(run(&mut k), Some(t));

    assert_eq!(q.receive(&mut k, &mut d), Ok(9));
    assert!(q.is_empty());
}

#[test]
fn test_zero_tick_timeout_does_not_wait() {
    let mut k = kernel();
    spawn(&mut k, "t", 5);
    k.start().unwrap();

    let mut q: Queue<u8, 1> = Queue::create(&mut k).unwrap();
    let mut d = k.deadline(Timeout::Ticks(0));
    assert_eq!(q.receive(&mut k, &mut d), Err(OsError::QEmpty));

    q.send(&mut k, 1, &mut Deadline::NO_WAIT).unwrap();
    let mut d = k.deadline(Timeout::Ticks(0));
    assert_eq!(q.send(&mut k, 2, &mut d), Err(OsError::QFull));

    let s = k.sem_create_binary().unwrap();
    let mut d = k.deadline(Timeout::Ticks(0));
    assert_eq!(k.sem_take(s, &mut d), Err(OsError::PendWouldBlock));
}

#[test]
fn test_isr_send_wakes_receiver() {
    let mut k = kernel();
    let t = spawn(&mut k, "t", 5);
    spawn(&mut k, "other", 1);
    k.start().unwrap();

    let mut q: Queue<u32, 2> = Queue::create(&mut k).unwrap();
    let mut d = k.deadline(Timeout::Forever);
    assert_eq!(q.receive(&mut k, &mut d), Err(OsError::Blocked));
    run(&mut k);

    let mut isr = k.isr();
    assert_eq!(q.send_from_isr(&mut isr, 42), Ok(true));
    assert!(isr.exit());
    assert_eq!(run(&mut k), Some(t));
    assert_eq!(q.receive(&mut k, &mut d), Ok(42));
}

#[test]
fn test_queue_overwrite_and_reset() {
    let mut k = kernel();
    spawn(&mut k, "t", 5);
    let waiter = spawn(&mut k, "waiter", 7);
    k.start().unwrap();
    assert_eq!(k.current(), Some(waiter));

    let mut slot: Queue<u32, 1> = Queue::create(&mut k).unwrap();
    assert_eq!(slot.overwrite(&mut k, 1), Ok(false));
    assert_eq!(slot.overwrite(&mut k, 2), Ok(false));
    assert_eq!(slot.peek(&k), Ok(2));
    assert_eq!(slot.messages_waiting(), 1);

    let mut pair: Queue<u32, 2> = Queue::create(&mut k).unwrap();
    assert_eq!(pair.overwrite(&mut k, 1), Err(OsError::QSize));

    // A sender blocked on a full queue gets in after a reset
    let mut d = k.deadline(Timeout::Forever);
    assert_eq!(slot.send(&mut k, 3, &mut d), Err(OsError::Blocked));
    run(&mut k);
    slot.reset(&mut k).unwrap();
    assert!(slot.is_empty());
    assert_eq!(run(&mut k), Some(waiter));
    assert_eq!(slot.send(&mut k, 3, &mut d), Ok(()));
    assert_eq!(slot.peek(&k), Ok(3));
}

#[test]
fn test_deleted_queue_fails_waiters() {
    let mut k = kernel();
    let t = spawn(&mut k, "t", 5);
    spawn(&mut k, "other", 1);
    k.start().unwrap();

    let mut q: Queue<u8, 1> = Queue::create(&mut k).unwrap();
    let mut d = k.deadline(Timeout::Forever);
    assert_eq!(q.receive(&mut k, &mut d), Err(OsError::Blocked));
    run(&mut k);

    k.registry_add(q.id(), "doomed").unwrap();
    q.delete(&mut k).unwrap();
    assert_eq!(run(&mut k), Some(t));
    assert_eq!(k.objects_in_use(), 0);
    assert_eq!(k.registry_find("doomed"), None);
}

// ============ Semaphore ============

#[test]
fn test_counting_semaphore() {
    let mut k = kernel();
    spawn(&mut k, "t", 5);
    k.start().unwrap();

    assert_eq!(k.sem_create(0, 0), Err(OsError::QSize));
    assert_eq!(k.sem_create(2, 3), Err(OsError::QSize));

    let s = k.sem_create(3, 1).unwrap();
    k.sem_take(s, &mut Deadline::NO_WAIT).unwrap();
    assert_eq!(
        k.sem_take(s, &mut Deadline::NO_WAIT),
        Err(OsError::PendWouldBlock)
    );
    for _ in 0..3 {
        k.sem_give(s).unwrap();
    }
    assert_eq!(k.sem_count(s), Ok(3));
    assert_eq!(k.sem_give(s), Err(OsError::SemOvf));
}

#[test]
fn test_semaphore_delete_fails_waiter() {
    let mut k = kernel();
    let t = spawn(&mut k, "t", 5);
    let other = spawn(&mut k, "other", 3);
    k.start().unwrap();

    let s = k.sem_create_binary().unwrap();
    let mut d = k.deadline(Timeout::Forever);
    assert_eq!(k.sem_take(s, &mut d), Err(OsError::Blocked));
    assert_eq!(run(&mut k), Some(other));

    k.sem_delete(s).unwrap();
    assert_eq!(run(&mut k), Some(t));
    assert_eq!(k.sem_take(s, &mut d), Err(OsError::ObjDel));
    assert_eq!(k.sem_count(s), Err(OsError::ObjInvalid));
}

#[test]
fn test_isr_give_wakes_taker() {
    let mut k = kernel();
    let t = spawn(&mut k, "t", 5);
    spawn(&mut k, "other", 1);
    k.start().unwrap();

    let s = k.sem_create_binary().unwrap();
    let mut d = k.deadline(Timeout::Forever);
    assert_eq!(k.sem_take(s, &mut d), Err(OsError::Blocked));
    run(&mut k);

    let mut isr = k.isr();
    assert_eq!(isr.sem_give(s), Ok(true));
    assert!(isr.exit());
    assert_eq!(run(&mut k), Some(t));
    assert_eq!(k.sem_take(s, &mut d), Ok(()));
    assert_eq!(k.sem_count(s), Ok(0));

    let mut isr = k.isr();
    assert_eq!(isr.sem_take(s), Err(OsError::PendWouldBlock));
}

#[test]
fn test_aborted_and_suspended_waits() {
    let mut k = kernel();
    let t = spawn(&mut k, "t", 5);
    let other = spawn(&mut k, "other", 3);
    k.start().unwrap();

    let s = k.sem_create_binary().unwrap();
    let mut d = k.deadline(Timeout::Forever);
    assert_eq!(k.sem_take(s, &mut d), Err(OsError::Blocked));
    run(&mut k);
    k.task_abort_wait(t).unwrap();
    assert_eq!(run(&mut k), Some(t));
    assert_eq!(k.sem_take(s, &mut d), Err(OsError::PendAbort));

    let mut d = k.deadline(Timeout::Forever);
    assert_eq!(k.sem_take(s, &mut d), Err(OsError::Blocked));
    assert_eq!(run(&mut k), Some(other));
    k.task_suspend(t).unwrap();
    k.sem_give(s).unwrap();
    assert_eq!(k.sem_count(s), Ok(1));
    k.task_resume(t).unwrap();
    assert_eq!(run(&mut k), Some(t));
    assert_eq!(k.sem_take(s, &mut d), Err(OsError::PendAbort));
}

// ============ Queue set ============

#[test]
fn test_queue_set_membership_rules() {
    let mut k = kernel();
    let set = k.set_create(4).unwrap();
    let q1: Queue<u8, 2> = Queue::create(&mut k).unwrap();
    let q2: Queue<u8, 2> = Queue::create(&mut k).unwrap();
    let mut q3: Queue<u8, 1> = Queue::create(&mut k).unwrap();
    let s = k.sem_create_binary().unwrap();

    k.set_add(set, q1.id()).unwrap();
    k.set_add(set, q2.id()).unwrap();
    assert_eq!(k.set_add(set, s), Err(OsError::SetFull));
    assert_eq!(k.set_add(set, q1.id()), Err(OsError::SetMember));
    assert_eq!(k.set_of(q1.id()), Ok(Some(set)));

    q3.send(&mut k, 1, &mut Deadline::NO_WAIT).unwrap();
    k.set_remove(set, q2.id()).unwrap();
    assert_eq!(k.set_add(set, q3.id()), Err(OsError::SetMemberNotEmpty));
    assert_eq!(k.set_remove(set, q3.id()), Err(OsError::SetNotMember));
    k.set_add(set, s).unwrap();

    let m = k.mutex_create(false).unwrap();
    assert_eq!(k.set_add(set, m), Err(OsError::ObjType));
    assert_eq!(k.set_create(0), Err(OsError::QSize));
}

#[test]
fn test_queue_set_select_order() {
    let mut k = kernel();
    spawn(&mut k, "t", 5);
    k.start().unwrap();

    let set = k.set_create(4).unwrap();
    let mut q1: Queue<u8, 2> = Queue::create(&mut k).unwrap();
    let mut q2: Queue<u8, 2> = Queue::create(&mut k).unwrap();
    k.set_add(set, q1.id()).unwrap();
    k.set_add(set, q2.id()).unwrap();

    q2.send(&mut k, 20, &mut Deadline::NO_WAIT).unwrap();
    q1.send(&mut k, 10, &mut Deadline::NO_WAIT).unwrap();
    q2.send(&mut k, 21, &mut Deadline::NO_WAIT).unwrap();
    assert_eq!(k.set_len(set), Ok(3));

    let mut drained = Vec::new();
    while let Ok(member) = k.set_select(set, &mut Deadline::NO_WAIT) {
        let item = if member == q1.id() {
            q1.receive(&mut k, &mut Deadline::NO_WAIT)
        } else {
            q2.receive(&mut k, &mut Deadline::NO_WAIT)
        };
        drained.push(item.unwrap());
    }
    assert_eq!(drained, vec![20, 10, 21]);
    assert_eq!(
        k.set_select(set, &mut Deadline::NO_WAIT),
        Err(OsError::PendWouldBlock)
    );
}

#[test]
fn test_queue_reset_drops_its_set_entries() {
    let mut k = kernel();
    spawn(&mut k, "t", 5);
    k.start().unwrap();

    let set = k.set_create(3).unwrap();
    let mut q: Queue<u8, 2> = Queue::create(&mut k).unwrap();
    let s = k.sem_create_binary().unwrap();
    k.set_add(set, q.id()).unwrap();
    k.set_add(set, s).unwrap();

    q.send(&mut k, 1, &mut Deadline::NO_WAIT).unwrap();
    k.sem_give(s).unwrap();
    q.send(&mut k, 2, &mut Deadline::NO_WAIT).unwrap();
    assert_eq!(k.set_len(set), Ok(3));

    // Only the semaphore's event survives, and the queue stays a member
    q.reset(&mut k).unwrap();
    assert_eq!(k.set_len(set), Ok(1));
    assert_eq!(k.set_of(q.id()), Ok(Some(set)));

    q.send(&mut k, 3, &mut Deadline::NO_WAIT).unwrap();
    q.send(&mut k, 4, &mut Deadline::NO_WAIT).unwrap();
    assert_eq!(k.set_len(set), Ok(3));

    let mut events = Vec::new();
    while let Ok(member) = k.set_select(set, &mut Deadline::NO_WAIT) {
        if member == q.id() {
            events.push(q.receive(&mut k, &mut Deadline::NO_WAIT).unwrap());
        } else {
            k.sem_take(s, &mut Deadline::NO_WAIT).unwrap();
            events.push(0);
        }
    }
    assert_eq!(events, vec![0, 3, 4]);
    assert!(q.is_empty());
}

#[test]
fn test_queue_set_select_blocks_until_post() {
    let mut k = kernel();
    let t = spawn(&mut k, "t", 5);
    spawn(&mut k, "other", 1);
    k.start().unwrap();

    let set = k.set_create(2).unwrap();
    let s = k.sem_create(2, 0).unwrap();
    k.set_add(set, s).unwrap();

    let mut d = k.deadline(Timeout::Forever);
    assert_eq!(k.set_select(set, &mut d), Err(OsError::Blocked));
    run(&mut k);

    k.sem_give(s).unwrap();
    assert_eq!(run(&mut k), Some(t));
    assert_eq!(k.set_select(set, &mut d), Ok(s));
    k.sem_take(s, &mut Deadline::NO_WAIT).unwrap();

    let mut isr = k.isr();
    assert_eq!(isr.set_select(set), Ok(None));
}

// ============ Notification ============

#[test]
fn test_notify_as_counting_semaphore() {
    let mut k = kernel();
    let t = spawn(&mut k, "t", 5);
    spawn(&mut k, "other", 3);
    k.start().unwrap();

    let mut d = k.deadline(Timeout::Forever);
    assert_eq!(k.notify_take(false, &mut d), Err(OsError::Blocked));
    run(&mut k);

    for _ in 0..3 {
        k.notify_give(t).unwrap();
    }
    assert_eq!(run(&mut k), Some(t));
    assert_eq!(k.notify_take(false, &mut d), Ok(3));
    assert_eq!(k.notify_take(true, &mut Deadline::NO_WAIT), Ok(2));
    assert_eq!(
        k.notify_take(true, &mut Deadline::NO_WAIT),
        Err(OsError::PendWouldBlock)
    );
}

#[test]
fn test_notify_wait_masks() {
    let mut k = kernel();
    let t = spawn(&mut k, "t", 5);
    k.start().unwrap();

    k.notify(t, NotifyAction::SetBits(0b101)).unwrap();
    assert_eq!(k.notify_wait(0, 0b001, &mut Deadline::NO_WAIT), Ok(0b101));
    assert_eq!(k.notify_value_clear(t, 0), Ok(0b100));

    // Nothing pending: clear on entry, then no wait allowed
    assert_eq!(
        k.notify_wait(u32::MAX, 0, &mut Deadline::NO_WAIT),
        Err(OsError::PendWouldBlock)
    );
    assert_eq!(k.notify_value_clear(t, 0), Ok(0));
}

#[test]
fn test_notify_without_overwrite() {
    let mut k = kernel();
    let t = spawn(&mut k, "t", 5);

    k.notify(t, NotifyAction::SetValueWithoutOverwrite(5)).unwrap();
    assert_eq!(
        k.notify(t, NotifyAction::SetValueWithoutOverwrite(6)),
        Err(OsError::NotifyPending)
    );
    assert_eq!(k.notify_value_clear(t, 0), Ok(5));

    assert_eq!(k.notify_state_clear(t), Ok(true));
    assert_eq!(k.notify_state_clear(t), Ok(false));
    k.notify(t, NotifyAction::SetValueWithoutOverwrite(6)).unwrap();
    k.notify(t, NotifyAction::SetValueWithOverwrite(7)).unwrap();
    assert_eq!(k.notify_value_clear(t, u32::MAX), Ok(7));
}

#[test]
fn test_isr_notify_wakes_waiter() {
    let mut k = kernel();
    let t = spawn(&mut k, "t", 5);
    spawn(&mut k, "other", 1);
    k.start().unwrap();

    let mut d = k.deadline(Timeout::Ticks(50));
    assert_eq!(k.notify_wait(0, u32::MAX, &mut d), Err(OsError::Blocked));
    run(&mut k);

    let mut isr = k.isr();
    assert_eq!(isr.notify(t, NotifyAction::SetBits(0x80)), Ok(true));
    assert!(isr.exit());
    assert_eq!(run(&mut k), Some(t));
    assert_eq!(k.notify_wait(0, u32::MAX, &mut d), Ok(0x80));
    assert_eq!(k.notify_value_clear(t, 0), Ok(0));
}

// ============ Registry and object pool ============

#[test]
fn test_queue_registry() {
    let mut k = kernel();
    let q: Queue<u8, 2> = Queue::create(&mut k).unwrap();
    k.registry_add(q.id(), "rx").unwrap();
    assert_eq!(k.registry_find("rx"), Some(q.id()));
    assert_eq!(k.registry_name(q.id()), Some("rx"));

    // Re-adding renames in place
    k.registry_add(q.id(), "uart_rx").unwrap();
    assert_eq!(k.registry_find("rx"), None);

    for _ in 1..CFG_QUEUE_REGISTRY_SIZE {
        let s = k.sem_create_binary().unwrap();
        k.registry_add(s, "sem").unwrap();
    }
    let extra = k.sem_create_binary().unwrap();
    assert_eq!(k.registry_add(extra, "extra"), Err(OsError::RegistryFull));

    q.delete(&mut k).unwrap();
    assert_eq!(k.registry_find("uart_rx"), None);
    k.registry_add(extra, "extra").unwrap();
}

#[test]
fn test_object_pool_exhaustion() {
    let mut k = kernel();
    let mut created = Vec::new();
    loop {
        match k.sem_create_binary() {
            Ok(id) => created.push(id),
            Err(err) => {
                assert_eq!(err, OsError::ObjPoolFull);
                break;
            }
        }
    }
    assert_eq!(created.len(), CFG_MAX_OBJECTS);
    assert_eq!(k.objects_in_use(), CFG_MAX_OBJECTS);

    k.sem_delete(created[0]).unwrap();
    assert!(k.mutex_create(false).is_ok());
    assert_eq!(k.sem_count(created[0]), Err(OsError::ObjInvalid));
}
