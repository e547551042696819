use std::collections::VecDeque;

use log::warn;

/// Post-hoc expected/received comparison, the harness-level safety net that
/// corroborates the live [`crate::Checker`]. Expected values come from the
/// driver, received values from an output observer; pairs are compared
/// eagerly in arrival order as soon as both sides have data.
pub struct Scoreboard<T>
where
    T: PartialEq,
{
    exp_q: VecDeque<T>,
    recv_q: VecDeque<T>,
    errors: u32,
    expected: u32,
    received: u32,
    matched: u32,
}

impl<T> Scoreboard<T>
where
    T: PartialEq + std::fmt::Debug,
{
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Scoreboard {
            exp_q: VecDeque::new(),
            recv_q: VecDeque::new(),
            errors: 0,
            expected: 0,
            received: 0,
            matched: 0,
        }
    }

    pub fn add_exp(&mut self, data: T) {
        self.exp_q.push_back(data);
        self.expected += 1;
        self.compare();
    }

    pub fn add_recv(&mut self, data: T) {
        self.recv_q.push_back(data);
        self.received += 1;
        self.compare();
    }

    fn compare(&mut self) {
        while !self.exp_q.is_empty() && !self.recv_q.is_empty() {
            let exp = self.exp_q.pop_front().unwrap();
            let recv = self.recv_q.pop_front().unwrap();
            if exp == recv {
                self.matched += 1;
            } else {
                warn!("scoreboard mismatch: expected {:?}, received {:?}", exp, recv);
                self.errors += 1;
            }
        }
    }

    pub fn result_str(&self) -> String {
        format!(
            "expected={}, received={}, matched={}, errors={}, expQ: {}, recvQ: {}",
            self.expected,
            self.received,
            self.matched,
            self.errors,
            self.exp_q.len(),
            self.recv_q.len()
        )
    }

    pub fn passed(&self) -> bool {
        self.expected > 0
            && self.received == self.expected
            && self.matched == self.received
            && self.errors == 0
            && self.exp_q.is_empty()
            && self.recv_q.is_empty()
    }

    pub fn matched(&self) -> u32 {
        self.matched
    }

    pub fn errors(&self) -> u32 {
        self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matched_in_order() {
        let mut sb = Scoreboard::new();
        for v in 0..5u32 {
            sb.add_exp(v);
        }
        for v in 0..5u32 {
            sb.add_recv(v);
        }
        assert!(sb.passed());
        assert_eq!(sb.matched(), 5);
    }

    #[test]
    fn mismatch_is_counted() {
        let mut sb = Scoreboard::new();
        sb.add_exp(1u32);
        sb.add_recv(2u32);
        assert!(!sb.passed());
        assert_eq!(sb.errors(), 1);
    }

    #[test]
    fn leftover_expected_fails() {
        let mut sb = Scoreboard::new();
        sb.add_exp(1u32);
        sb.add_exp(2u32);
        sb.add_recv(1u32);
        assert!(!sb.passed());
        assert_eq!(sb.matched(), 1);
    }

    #[test]
    fn empty_scoreboard_does_not_pass() {
        let sb = Scoreboard::<u32>::new();
        assert!(!sb.passed());
    }
}
