//! Button-side PIN entry
//!
//! The unlock screen shows a five digit guess with a cursor. Up/Down edit
//! the digit under the cursor in place, wrapping within that digit only;
//! Left/Right move the cursor without wrapping past the ends.

/// Digits in a PIN guess
pub const PIN_DIGITS: usize = 5;

/// Editable five-digit PIN guess
#[derive(Debug, Clone, Copy)]
pub struct PinGuess {
    digits: [u8; PIN_DIGITS],
    cursor: u8,
}

impl PinGuess {
    pub fn new() -> Self {
        Self {
            digits: [0; PIN_DIGITS],
            cursor: 0,
        }
    }

    /// Digits, most significant first
    pub fn digits(&self) -> &[u8; PIN_DIGITS] {
        &self.digits
    }

    /// Cursor position; 0 is the most significant digit
    pub fn cursor(&self) -> u8 {
        self.cursor
    }

    /// The assembled guess value (0..=99999)
    pub fn value(&self) -> u32 {
        self.digits
            .iter()
            .fold(0u32, |acc, &d| acc * 10 + u32::from(d))
    }

    /// Bump the digit under the cursor, 9 wrapping to 0
    pub fn increment(&mut self) {
        let d = &mut self.digits[self.cursor as usize];
        *d = (*d + 1) % 10;
    }

    /// Drop the digit under the cursor, 0 wrapping to 9
    pub fn decrement(&mut self) {
        let d = &mut self.digits[self.cursor as usize];
        *d = (*d + 9) % 10;
    }

    /// Move the cursor one place left; stops at the leftmost digit
    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Move the cursor one place right; stops at the rightmost digit
    pub fn move_right(&mut self) {
        if (self.cursor as usize) < PIN_DIGITS - 1 {
            self.cursor += 1;
        }
    }
}

impl Default for PinGuess {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_digit_edit_at_cursor() {
        let mut guess = PinGuess::new();
        guess.increment();
        assert_eq!(guess.value(), 10_000);

        guess.move_right();
        guess.move_right();
        guess.increment();
        guess.increment();
        assert_eq!(guess.value(), 10_200);
    }

    #[test]
    fn test_digit_wraps_without_carry() {
        let mut guess = PinGuess::new();
        guess.move_right();
        for _ in 0..10 {
            guess.increment();
        }
        // Ten bumps return the digit to where it started; nothing carries
        // into the neighbor
        assert_eq!(guess.value(), 0);

        guess.decrement();
        assert_eq!(guess.value(), 9_000);
    }

    #[test]
    fn test_cursor_clamps_at_ends() {
        let mut guess = PinGuess::new();
        guess.move_left();
        assert_eq!(guess.cursor(), 0);

        for _ in 0..10 {
            guess.move_right();
        }
        assert_eq!(guess.cursor(), (PIN_DIGITS - 1) as u8);
    }

    proptest! {
        #[test]
        fn prop_value_stays_in_range(ops in proptest::collection::vec(0u8..4, 0..64)) {
            let mut guess = PinGuess::new();
            for op in ops {
                match op {
                    0 => guess.increment(),
                    1 => guess.decrement(),
                    2 => guess.move_left(),
                    _ => guess.move_right(),
                }
                prop_assert!(guess.value() <= 99_999);
                prop_assert!((guess.cursor() as usize) < PIN_DIGITS);
            }
        }
    }
}
