//! Seeded random operation sequences
//!
//! A fixed-seed generator mixes task creation, deletion, suspension,
//! priority changes, mutex traffic, delays and ticks. After every step the
//! running task must be the most urgent ready one, and every task's
//! effective priority must be exactly what its held mutexes' waiters lend.

mod common;

use common::*;
use rtcore::{Deadline, Kernel, ObjId, OsError, OsPrio, OsTaskState, TaskId, Timeout};

const MAX_LIVE: usize = 8;
const MUTEXES: usize = 3;
const STEPS: usize = 3000;

/// 64-bit LCG, Knuth's MMIX constants
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) as u32
    }

    fn below(&mut self, n: usize) -> usize {
        self.next() as usize % n
    }

    fn pick<T: Copy>(&mut self, items: &[T]) -> Option<T> {
        match items.len() {
            0 => None,
            n => Some(items[self.below(n)]),
        }
    }

    fn prio(&mut self) -> OsPrio {
        1 + self.below(6) as OsPrio
    }
}

/// A lock call that returned `Blocked` and must be repeated by its task
struct Pending {
    task: TaskId,
    mutex: ObjId,
    deadline: Deadline,
}

struct World {
    k: Kernel,
    tasks: Vec<TaskId>,
    mutexes: Vec<ObjId>,
    pending: Vec<Pending>,
}

impl World {
    fn new(rng: &mut Lcg) -> World {
        let mut k = kernel();
        let mut tasks = Vec::new();
        for name in ["a", "b", "c", "d"] {
            tasks.push(spawn(&mut k, name, rng.prio()));
        }
        k.start().unwrap();
        let mutexes = (0..MUTEXES).map(|_| k.mutex_create(false).unwrap()).collect();
        World {
            k,
            tasks,
            mutexes,
            pending: Vec::new(),
        }
    }

    /// The running task, unless it is idle
    fn me(&self) -> Option<TaskId> {
        self.k.current().filter(|&t| Some(t) != self.k.idle_task())
    }

    fn held_by(&self, task: TaskId) -> Vec<usize> {
        (0..self.mutexes.len())
            .filter(|&i| self.k.mutex_holder(self.mutexes[i]) == Ok(Some(task)))
            .collect()
    }

    /// Let whichever task runs finish its interrupted lock call first
    fn settle(&mut self) {
        run(&mut self.k);
        while let Some(cur) = self.k.current() {
            let Some(pos) = self.pending.iter().position(|p| p.task == cur) else {
                return;
            };
            let p = &mut self.pending[pos];
            match self.k.mutex_lock(p.mutex, &mut p.deadline) {
                Err(OsError::Blocked) => {
                    run(&mut self.k);
                }
                Ok(()) | Err(OsError::Timeout) | Err(OsError::PendAbort) => {
                    self.pending.swap_remove(pos);
                }
                other => panic!("unexpected lock result {other:?}"),
            }
        }
    }

    fn forget(&mut self, task: TaskId) {
        self.tasks.retain(|&t| t != task);
        self.pending.retain(|p| p.task != task);
    }

    fn step(&mut self, rng: &mut Lcg) {
        match rng.below(11) {
            0 if self.tasks.len() < MAX_LIVE => {
                let prio = rng.prio();
                let t = spawn(&mut self.k, "n", prio);
                self.tasks.push(t);
            }
            1 => {
                let others: Vec<TaskId> = self
                    .tasks
                    .iter()
                    .copied()
                    .filter(|&t| Some(t) != self.k.current())
                    .collect();
                if let Some(t) = rng.pick(&others) {
                    self.k.task_delete(t).unwrap();
                    self.forget(t);
                }
            }
            2 => {
                if let Some(t) = rng.pick(&self.tasks) {
                    self.k.task_suspend(t).unwrap();
                }
            }
            3 | 4 => {
                if let Some(t) = rng.pick(&self.tasks) {
                    let _ = self.k.task_resume(t);
                }
            }
            5 | 6 => {
                let Some(me) = self.me() else { return };
                // Ordered acquisition keeps the holder graph acyclic
                let first = self.held_by(me).last().map_or(0, |&i| i + 1);
                if first >= self.mutexes.len() {
                    return;
                }
                let mutex = self.mutexes[first + rng.below(self.mutexes.len() - first)];
                let timeout = match rng.below(3) {
                    0 => Timeout::NoWait,
                    1 => Timeout::Ticks(1 + rng.below(4) as u32),
                    _ => Timeout::Forever,
                };
                let mut deadline = self.k.deadline(timeout);
                match self.k.mutex_lock(mutex, &mut deadline) {
                    Err(OsError::Blocked) => self.pending.push(Pending {
                        task: me,
                        mutex,
                        deadline,
                    }),
                    Ok(()) | Err(OsError::PendWouldBlock) => {}
                    other => panic!("unexpected lock result {other:?}"),
                }
            }
            7 => {
                let Some(me) = self.me() else { return };
                if let Some(i) = rng.pick(&self.held_by(me)) {
                    self.k.mutex_unlock(self.mutexes[i]).unwrap();
                }
            }
            8 => {
                if self.me().is_some() {
                    self.k.delay(1 + rng.below(3) as u32).unwrap();
                }
            }
            9 => tick(&mut self.k),
            _ => {
                if let Some(t) = rng.pick(&self.tasks) {
                    let prio = rng.prio();
                    self.k.task_priority_set(t, prio).unwrap();
                }
            }
        }
    }

    fn check(&self, step: usize) {
        let cur = self.k.current().unwrap();
        let running = self.k.task_info(cur).unwrap();
        assert_eq!(running.state, OsTaskState::Running, "step {step}");

        let idle = self.k.idle_task().unwrap();
        for &t in self.tasks.iter().chain([&idle]) {
            let info = self.k.task_info(t).unwrap();
            if info.state == OsTaskState::Ready {
                assert!(
                    info.prio <= running.prio,
                    "step {step}: ready task at {} while {} runs",
                    info.prio,
                    running.prio
                );
            }
        }

        for &t in &self.tasks {
            let info = self.k.task_info(t).unwrap();
            let mut owed = info.base_prio;
            for i in self.held_by(t) {
                for p in self.pending.iter().filter(|p| p.mutex == self.mutexes[i]) {
                    let waiter = self.k.task_info(p.task).unwrap();
                    if waiter.state == OsTaskState::Blocked {
                        assert!(waiter.prio <= info.prio, "step {step}: holder below waiter");
                        owed = owed.max(waiter.prio);
                    }
                }
            }
            assert_eq!(info.prio, owed, "step {step}: task {} priority", t.index());
        }
    }
}

fn replay(seed: u64) {
    let mut rng = Lcg(seed);
    let mut w = World::new(&mut rng);
    w.settle();
    w.check(0);
    for step in 1..=STEPS {
        w.step(&mut rng);
        w.settle();
        w.check(step);
    }

    // Wind down: every task gets to run and drop what it holds
    for t in w.tasks.clone() {
        let _ = w.k.task_resume(t);
    }
    for _ in 0..STEPS {
        w.settle();
        if let Some(me) = w.me() {
            for i in w.held_by(me) {
                w.k.mutex_unlock(w.mutexes[i]).unwrap();
            }
            // Long enough for every other task to get a turn
            w.k.delay(2 * MAX_LIVE as u32).unwrap();
        }
        tick(&mut w.k);
        w.settle();
        w.check(STEPS);
    }
    for &t in &w.tasks {
        let info = w.k.task_info(t).unwrap();
        assert_eq!(info.prio, info.base_prio);
    }
}

#[test]
fn test_random_sequence_seed_1() {
    replay(1);
}

#[test]
fn test_random_sequence_seed_2024() {
    replay(2024);
}

#[test]
fn test_random_sequence_seed_large() {
    replay(0x9E37_79B9_7F4A_7C15);
}
