//! Conditional stack for IF/NOTIF/ELSE/ENDIF
//!
//! Only the outermost false frame matters for execution and only the
//! topmost frame can flip, so the stack is kept as two counters: its depth
//! and the position of the first false frame. Code executes iff no open
//! frame is false.

const NO_FALSE: usize = usize::MAX;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionStack {
    size: usize,
    first_false_pos: usize,
}

impl Default for ConditionStack {
    fn default() -> Self {
        Self {
            size: 0,
            first_false_pos: NO_FALSE,
        }
    }
}

impl ConditionStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn all_if_true(&self) -> bool {
        self.first_false_pos == NO_FALSE
    }

    pub fn push(&mut self, value: bool) {
        if self.first_false_pos == NO_FALSE && !value {
            self.first_false_pos = self.size;
        }
        self.size += 1;
    }

    /// Closes the innermost frame. `false` if none is open.
    pub fn pop(&mut self) -> bool {
        if self.size == 0 {
            return false;
        }
        self.size -= 1;
        if self.first_false_pos == self.size {
            self.first_false_pos = NO_FALSE;
        }
        true
    }

    /// Flips the innermost frame. `false` if none is open.
    pub fn toggle_top(&mut self) -> bool {
        if self.size == 0 {
            return false;
        }
        if self.first_false_pos == NO_FALSE {
            self.first_false_pos = self.size - 1;
        } else if self.first_false_pos == self.size - 1 {
            self.first_false_pos = NO_FALSE;
        }
        // a deeper false frame keeps everything above it unexecuted
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_branches() {
        let mut cs = ConditionStack::new();
        assert!(cs.all_if_true());
        cs.push(true);
        cs.push(false);
        assert!(!cs.all_if_true());
        assert!(cs.toggle_top());
        assert!(cs.all_if_true());
        assert_eq!(cs.len(), 2);
        assert!(cs.pop());
        assert!(cs.toggle_top());
        assert!(!cs.all_if_true());
        assert!(cs.pop());
        assert!(cs.is_empty());
        assert!(!cs.pop());
        assert!(!cs.toggle_top());
    }

    #[test]
    fn test_inner_toggle_under_false_frame() {
        let mut cs = ConditionStack::new();
        cs.push(false);
        cs.push(false);
        assert!(cs.toggle_top());
        assert!(!cs.all_if_true());
        cs.pop();
        assert!(cs.toggle_top());
        assert!(cs.all_if_true());
    }
}
