use chrono::NaiveDateTime;
use parking_lot::RwLock;

use crate::model::{ConnectionStatus, SensorGroup, Snapshot};

/// Shared live state: written only by the ingestion loop, read by query
/// handlers. The lock is held just long enough to apply one update or to
/// clone the snapshot out, so readers never observe a torn write.
#[derive(Debug, Default)]
pub struct SharedState {
    inner: RwLock<Snapshot>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one reading into the snapshot. Metrics absent from the reading
    /// keep their previous value; freshness stamps and connection status are
    /// refreshed in the same critical section.
    pub fn update(&self, group: SensorGroup, values: &[Option<f64>], at: NaiveDateTime) {
        let mut snap = self.inner.write();
        for (col, value) in group.columns().iter().zip(values) {
            if value.is_some() {
                snap.values[col.index()] = *value;
            }
        }
        // Both gas modules share one freshness stamp; the particulate module
        // has its own.
        match group {
            SensorGroup::Scd41 | SensorGroup::Ccs811 => snap.last_update_co2 = Some(at),
            SensorGroup::Sps30 => snap.last_update_pm = Some(at),
        }
        snap.timestamp = Some(at);
        snap.last_update = Some(at);
        snap.connection_status = ConnectionStatus::Connected;
    }

    /// Copy-out read of the full current state.
    pub fn snapshot(&self) -> Snapshot {
        self.inner.read().clone()
    }

    pub fn mark_connected(&self) {
        self.inner.write().connection_status = ConnectionStatus::Connected;
    }

    /// Flip to Disconnected but keep the last-known values visible.
    pub fn mark_disconnected(&self) {
        self.inner.write().connection_status = ConnectionStatus::Disconnected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Column;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 2)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_update_reflects_latest_value_per_metric() {
        let state = SharedState::new();
        state.update(SensorGroup::Scd41, &[Some(600.0), Some(21.0), Some(50.0)], at(10, 0, 0));
        state.update(SensorGroup::Scd41, &[Some(650.0), Some(21.5), Some(49.0)], at(10, 0, 5));

        let snap = state.snapshot();
        assert_eq!(snap.get(Column::Co2), Some(650.0));
        assert_eq!(snap.get(Column::Temperature), Some(21.5));
        assert_eq!(snap.get(Column::Humidity), Some(49.0));
        assert_eq!(snap.last_update, Some(at(10, 0, 5)));
        assert_eq!(snap.connection_status, ConnectionStatus::Connected);
    }

    #[test]
    fn test_update_merges_without_blanking_missing_metrics() {
        let state = SharedState::new();
        state.update(SensorGroup::Scd41, &[Some(600.0), Some(21.0), Some(50.0)], at(10, 0, 0));
        // Later frame without humidity keeps the old humidity value.
        state.update(SensorGroup::Scd41, &[Some(700.0), Some(22.0), None], at(10, 0, 5));

        let snap = state.snapshot();
        assert_eq!(snap.get(Column::Co2), Some(700.0));
        assert_eq!(snap.get(Column::Humidity), Some(50.0));
    }

    #[test]
    fn test_groups_do_not_clobber_each_other() {
        let state = SharedState::new();
        state.update(SensorGroup::Scd41, &[Some(600.0), Some(21.0), Some(50.0)], at(10, 0, 0));
        state.update(SensorGroup::Sps30, &[Some(3.0), Some(5.0), Some(8.0)], at(10, 0, 1));

        let snap = state.snapshot();
        assert_eq!(snap.get(Column::Co2), Some(600.0));
        assert_eq!(snap.get(Column::Pm25), Some(5.0));
        assert_eq!(snap.last_update_co2, Some(at(10, 0, 0)));
        assert_eq!(snap.last_update_pm, Some(at(10, 0, 1)));
    }

    #[test]
    fn test_both_gas_groups_refresh_the_gas_stamp() {
        let state = SharedState::new();
        state.update(SensorGroup::Scd41, &[Some(600.0), None, None], at(10, 0, 0));
        state.update(SensorGroup::Ccs811, &[Some(410.0), Some(15.0)], at(10, 0, 7));

        let snap = state.snapshot();
        assert_eq!(snap.last_update_co2, Some(at(10, 0, 7)));
        assert_eq!(snap.last_update_pm, None);
    }

    #[test]
    fn test_disconnect_keeps_last_known_values() {
        let state = SharedState::new();
        state.update(SensorGroup::Ccs811, &[Some(410.0), Some(15.0)], at(10, 0, 0));
        state.mark_disconnected();

        let snap = state.snapshot();
        assert_eq!(snap.connection_status, ConnectionStatus::Disconnected);
        assert_eq!(snap.get(Column::Eco2), Some(410.0));
        assert_eq!(snap.get(Column::Tvoc), Some(15.0));
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let state = SharedState::new();
        state.update(SensorGroup::Scd41, &[Some(600.0), None, None], at(10, 0, 0));
        let before = state.snapshot();
        state.update(SensorGroup::Scd41, &[Some(900.0), None, None], at(10, 0, 5));
        assert_eq!(before.get(Column::Co2), Some(600.0));
    }
}
