use std::collections::HashMap;
use std::sync::Mutex;

/// Named rotation indices for the display, shared by every viewer.
#[derive(Default)]
pub struct Rotation {
    indices: Mutex<HashMap<String, usize>>,
}

impl Rotation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index to show for a list of `len` items; 0 for an empty list.
    pub fn current(&self, key: &str, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        let indices = self.indices.lock().unwrap_or_else(|e| e.into_inner());
        indices.get(key).copied().unwrap_or(0) % len
    }

    /// Step to the next item, wrapping at `len`.
    pub fn advance(&self, key: &str, len: usize) {
        let mut indices = self.indices.lock().unwrap_or_else(|e| e.into_inner());
        let idx = indices.entry(key.to_string()).or_insert(0);
        *idx = (*idx + 1) % len.max(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero_and_wraps() {
        let rot = Rotation::new();
        assert_eq!(rot.current("news", 3), 0);
        rot.advance("news", 3);
        rot.advance("news", 3);
        assert_eq!(rot.current("news", 3), 2);
        rot.advance("news", 3);
        assert_eq!(rot.current("news", 3), 0);
    }

    #[test]
    fn empty_lists_stay_at_zero() {
        let rot = Rotation::new();
        assert_eq!(rot.current("videos", 0), 0);
        rot.advance("videos", 0);
        assert_eq!(rot.current("videos", 0), 0);
        assert_eq!(rot.current("videos", 5), 0);
    }

    #[test]
    fn shrinking_list_is_reduced_modulo() {
        let rot = Rotation::new();
        for _ in 0..4 {
            rot.advance("birthdays", 10);
        }
        assert_eq!(rot.current("birthdays", 3), 1);
    }

    #[test]
    fn keys_are_independent() {
        let rot = Rotation::new();
        rot.advance("news", 3);
        assert_eq!(rot.current("news", 3), 1);
        assert_eq!(rot.current("videos", 3), 0);
    }
}
