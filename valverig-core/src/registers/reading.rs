//! Decoded sample values keyed by field

use super::field::{Field, MAX_FIELDS};

/// One decoded sample: a value for each field the plan covers
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Reading {
    values: [Option<f64>; MAX_FIELDS],
}

impl Reading {
    /// Empty reading
    pub const fn new() -> Self {
        Self {
            values: [None; MAX_FIELDS],
        }
    }

    /// Value of a field, if it was sampled
    pub fn get(&self, field: Field) -> Option<f64> {
        self.values[field.index()]
    }

    /// Store a value
    pub fn set(&mut self, field: Field, value: f64) {
        self.values[field.index()] = Some(value);
    }

    /// Builder form of [`Reading::set`]
    pub fn with(mut self, field: Field, value: f64) -> Self {
        self.set(field, value);
        self
    }

    /// Drop every value
    pub fn clear(&mut self) {
        self.values = [None; MAX_FIELDS];
    }

    /// Sampled fields and their values in catalog order
    pub fn iter(&self) -> impl Iterator<Item = (Field, f64)> + '_ {
        Field::ALL
            .into_iter()
            .filter_map(|field| self.get(field).map(|value| (field, value)))
    }

    /// Number of sampled fields
    pub fn len(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// True when nothing was sampled
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_set_get() {
        let reading = Reading::new()
            .with(Field::Time, 0.5)
            .with(Field::AccelZ, 1.0);

        assert_eq!(reading.get(Field::Time), Some(0.5));
        assert_eq!(reading.get(Field::AccelZ), Some(1.0));
        assert_eq!(reading.get(Field::AccelX), None);
        assert_eq!(reading.len(), 2);

        let fields: heapless::Vec<Field, MAX_FIELDS> = reading.iter().map(|(f, _)| f).collect();
        assert_eq!(fields.as_slice(), &[Field::Time, Field::AccelZ]);
    }

    #[test]
    fn test_reading_clear() {
        let mut reading = Reading::new().with(Field::GyroX, -3.0);
        assert!(!reading.is_empty());
        reading.clear();
        assert!(reading.is_empty());
    }
}
