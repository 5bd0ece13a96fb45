//! Log row layout

use core::fmt;

use crate::registers::Field;

/// Number of sensors the log schema has columns for
pub const MAX_DEVICES: usize = 2;

/// Column names in output order
pub const COLUMNS: [&str; COLUMN_COUNT] = [
    "time", "A_X_0", "A_Y_0", "A_Z_0", "A_X_1", "A_Y_1", "A_Z_1", "VALVE",
];

/// Number of columns in a row
pub const COLUMN_COUNT: usize = 8;

/// Index of the aligned time column
pub const TIME_COLUMN: usize = 0;

/// Index of the valve snapshot column
pub const VALVE_COLUMN: usize = 7;

/// Fields logged per device, in column order
pub const LOGGED_AXES: [Field; 3] = [Field::AccelX, Field::AccelY, Field::AccelZ];

/// Identifier of one sensor (0 or 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId(u8);

impl DeviceId {
    /// Validate a device index
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < MAX_DEVICES {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Dense index for per-device tables
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Column holding `axis` for this device
    pub fn column(self, axis: Field) -> Option<usize> {
        LOGGED_AXES
            .iter()
            .position(|a| *a == axis)
            .map(|i| 1 + self.index() * LOGGED_AXES.len() + i)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One output row; empty cells are `None`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Row {
    cells: [Option<f64>; COLUMN_COUNT],
}

impl Row {
    /// Row with every cell empty
    pub const fn empty() -> Self {
        Self {
            cells: [None; COLUMN_COUNT],
        }
    }

    /// Cells in column order
    pub fn cells(&self) -> &[Option<f64>; COLUMN_COUNT] {
        &self.cells
    }

    /// Value of one column
    pub fn get(&self, column: usize) -> Option<f64> {
        self.cells.get(column).copied().flatten()
    }

    /// Set one column; out-of-range columns are ignored
    pub fn set(&mut self, column: usize, value: f64) {
        if let Some(cell) = self.cells.get_mut(column) {
            *cell = Some(value);
        }
    }

    /// Aligned time
    pub fn time(&self) -> Option<f64> {
        self.get(TIME_COLUMN)
    }

    /// Valve snapshot
    pub fn valve(&self) -> Option<f64> {
        self.get(VALVE_COLUMN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_columns() {
        let d0 = DeviceId::new(0).unwrap();
        let d1 = DeviceId::new(1).unwrap();

        assert_eq!(d0.column(Field::AccelX), Some(1));
        assert_eq!(d0.column(Field::AccelZ), Some(3));
        assert_eq!(d1.column(Field::AccelX), Some(4));
        assert_eq!(d1.column(Field::AccelZ), Some(6));
        assert_eq!(d1.column(Field::Time), None);
        assert_eq!(COLUMNS[d1.column(Field::AccelY).unwrap()], "A_Y_1");
    }

    #[test]
    fn test_device_id_range() {
        assert!(DeviceId::new(1).is_some());
        assert!(DeviceId::new(2).is_none());
    }

    #[test]
    fn test_row_cells() {
        let mut row = Row::empty();
        row.set(TIME_COLUMN, 0.25);
        row.set(42, 1.0);
        assert_eq!(row.time(), Some(0.25));
        assert_eq!(row.valve(), None);
        assert_eq!(row.cells().iter().filter(|c| c.is_some()).count(), 1);
    }
}
