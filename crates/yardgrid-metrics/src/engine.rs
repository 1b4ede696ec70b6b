//! Metrics engine.

use chrono::NaiveDate;
use serde::Serialize;
use yard_core::config::{EnergyMode, MetricsConfig};
use yardgrid_state::YardState;

/// Savings estimate relative to an unoptimized yard.
///
/// Derived from fixed, configured ratios. An estimate, not a guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BaselineComparison {
    pub baseline_moves: u64,
    pub optimized_moves: u64,
    pub money_saved: f64,
    /// Percentage of moves avoided.
    pub efficiency_increase: f64,
    pub carbon_reduction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub date: NaiveDate,
    pub total_containers: usize,
    pub total_weight: f64,
    pub overdue_containers: usize,
    pub average_stack_height: f64,
    pub max_stack_height: u32,
    pub occupied_cells: usize,
    pub total_cells: usize,
    /// Occupied cells / total cells.
    pub yard_utilization: f64,
    /// Containers away from their recorded prior position.
    pub moved_containers: usize,
    pub total_move_distance: u64,
    /// Summed crane time for the recorded moves.
    pub total_move_cost: f64,
    pub energy_consumption: f64,
    pub carbon_emissions: f64,
    pub storage_cost: f64,
    pub baseline: BaselineComparison,
}

#[derive(Debug, Clone, Default)]
pub struct MetricsEngine {
    config: MetricsConfig,
}

impl MetricsEngine {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    pub fn snapshot(&self, yard: &YardState, today: NaiveDate) -> MetricsSnapshot {
        let yard_config = yard.config();

        let mut total_weight = 0.0;
        let mut overdue_containers = 0;
        let mut storage_cost = 0.0;
        let mut moved_containers = 0;
        let mut total_move_distance = 0u64;
        let mut total_move_cost = 0.0;

        for (container, pos) in yard.residents() {
            total_weight += container.weight;
            storage_cost += container.storage_cost(today, self.config.storage_rate_per_day);
            if container.is_overdue(today) {
                overdue_containers += 1;
            }
            if let Some(prior) = yard.prior_position(&container.id)
                && prior != pos
            {
                moved_containers += 1;
                total_move_distance += u64::from(prior.manhattan(&pos));
                total_move_cost += yard_config.move_time(&prior, &pos);
            }
        }

        let (average_stack_height, max_stack_height) = stack_heights(yard);
        let occupied_cells = yard.len();
        let total_cells = yard_config.total_cells();

        let energy_consumption = match self.config.energy_mode {
            EnergyMode::PerMove => moved_containers as f64 * yard_config.crane_energy_consumption,
            EnergyMode::PerDistance => total_move_distance as f64 * yard_config.energy_consumption_rate,
        };

        MetricsSnapshot {
            date: today,
            total_containers: occupied_cells,
            total_weight,
            overdue_containers,
            average_stack_height,
            max_stack_height,
            occupied_cells,
            total_cells,
            yard_utilization: ratio(occupied_cells as f64, total_cells as f64),
            moved_containers,
            total_move_distance,
            total_move_cost,
            energy_consumption,
            carbon_emissions: energy_consumption * yard_config.carbon_emission_factor,
            storage_cost,
            baseline: self.baseline(occupied_cells),
        }
    }

    /// Fixed-ratio savings estimate for `total_containers`.
    pub fn baseline(&self, total_containers: usize) -> BaselineComparison {
        let baseline = (total_containers as f64 * self.config.baseline_moves_per_container)
            .round()
            .max(0.0);
        let optimized = (baseline * self.config.optimized_move_ratio).floor().max(0.0);
        let saved = baseline - optimized;

        BaselineComparison {
            baseline_moves: baseline as u64,
            optimized_moves: optimized as u64,
            money_saved: saved * self.config.cost_per_move,
            efficiency_increase: ratio(saved, baseline) * 100.0,
            carbon_reduction: saved * self.config.carbon_per_move,
        }
    }
}

/// Mean and maximum occupant count over all columns.
fn stack_heights(yard: &YardState) -> (f64, u32) {
    let config = yard.config();
    let mut sum = 0u64;
    let mut max = 0u32;
    for x in 0..config.length {
        for y in 0..config.width {
            let height = yard.column(x, y).count() as u32;
            sum += u64::from(height);
            max = max.max(height);
        }
    }
    (ratio(sum as f64, config.total_columns() as f64), max)
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 { numerator / denominator } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yardgrid_state::{Container, ContainerRecord, Position, YardConfig};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn yard() -> YardState {
        YardState::new(YardConfig {
            length: 5,
            width: 5,
            height: 3,
            max_weight_per_stack: 5000.0,
            crane_speed: 2.0,
            crane_energy_consumption: 5.0,
            energy_consumption_rate: 0.1,
            carbon_emission_factor: 0.5,
        })
    }

    fn container(id: &str, weight: f64, arrival: &str, departure: &str) -> Container {
        Container::from_record(ContainerRecord {
            id: id.to_string(),
            weight,
            destination: String::new(),
            arrival_date: Some(arrival.to_string()),
            departure_date: Some(departure.to_string()),
            content_type: String::new(),
            refrigerated: false,
            priority: 0,
        })
        .unwrap()
    }

    fn three_containers() -> YardState {
        let mut yard = yard();
        yard.add(container("A", 1000.0, "2024-05-22", "2024-06-10"), Position::new(0, 0, 0))
            .unwrap();
        yard.add(container("B", 2000.0, "2024-05-30", "2024-05-25"), Position::new(0, 0, 1))
            .unwrap();
        yard.add(container("C", 500.0, "2024-06-01", "2024-06-02"), Position::new(3, 3, 0))
            .unwrap();
        yard
    }

    #[test]
    fn occupancy_figures() {
        let yard = three_containers();
        let m = MetricsEngine::default().snapshot(&yard, today());

        assert_eq!(m.total_containers, 3);
        assert_eq!(m.total_weight, 3500.0);
        assert_eq!(m.yard_utilization, 3.0 / 75.0);
        assert_eq!(m.total_cells, 75);
        assert_eq!(m.overdue_containers, 1);
        assert_eq!(m.max_stack_height, 2);
        assert_eq!(m.average_stack_height, 3.0 / 25.0);
        // 10 + 2 + 0 days at 1.0 per day.
        assert_eq!(m.storage_cost, 12.0);
    }

    #[test]
    fn untouched_yard_has_no_movement_cost() {
        let yard = three_containers();
        let m = MetricsEngine::default().snapshot(&yard, today());
        assert_eq!(m.moved_containers, 0);
        assert_eq!(m.total_move_distance, 0);
        assert_eq!(m.total_move_cost, 0.0);
        assert_eq!(m.energy_consumption, 0.0);
        assert_eq!(m.carbon_emissions, 0.0);
    }

    #[test]
    fn movement_per_move_energy() {
        let mut yard = three_containers();
        yard.move_container("C", Position::new(1, 1, 0)).unwrap();
        yard.move_container("B", Position::new(0, 1, 0)).unwrap();

        let m = MetricsEngine::default().snapshot(&yard, today());
        assert_eq!(m.moved_containers, 2);
        assert_eq!(m.total_move_distance, 4 + 2);
        assert_eq!(m.total_move_cost, 3.0);
        assert_eq!(m.energy_consumption, 10.0);
        assert_eq!(m.carbon_emissions, 5.0);
    }

    #[test]
    fn movement_per_distance_energy() {
        let mut yard = three_containers();
        yard.move_container("C", Position::new(1, 1, 0)).unwrap();

        let engine = MetricsEngine::new(MetricsConfig {
            energy_mode: EnergyMode::PerDistance,
            ..MetricsConfig::default()
        });
        let m = engine.snapshot(&yard, today());
        assert_eq!(m.total_move_distance, 4);
        assert!((m.energy_consumption - 0.4).abs() < 1e-9);
        assert!((m.carbon_emissions - 0.2).abs() < 1e-9);
    }

    #[test]
    fn moving_back_home_is_not_a_move() {
        let mut yard = three_containers();
        yard.move_container("C", Position::new(1, 1, 0)).unwrap();
        yard.move_container("C", Position::new(3, 3, 0)).unwrap();
        let m = MetricsEngine::default().snapshot(&yard, today());
        assert_eq!(m.moved_containers, 0);
    }

    #[test]
    fn baseline_estimate() {
        let engine = MetricsEngine::default();
        let b = engine.baseline(3);
        assert_eq!(b.baseline_moves, 5);
        assert_eq!(b.optimized_moves, 4);
        assert_eq!(b.money_saved, 10.0);
        assert_eq!(b.efficiency_increase, 20.0);
        assert_eq!(b.carbon_reduction, 5.0);

        let empty = engine.baseline(0);
        assert_eq!(empty.baseline_moves, 0);
        assert_eq!(empty.efficiency_increase, 0.0);
    }

    #[test]
    fn empty_yard() {
        let m = MetricsEngine::default().snapshot(&yard(), today());
        assert_eq!(m.total_containers, 0);
        assert_eq!(m.average_stack_height, 0.0);
        assert_eq!(m.max_stack_height, 0);
        assert_eq!(m.yard_utilization, 0.0);
    }

    #[test]
    fn snapshot_serializes() {
        let m = MetricsEngine::default().snapshot(&three_containers(), today());
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["total_weight"], 3500.0);
        assert_eq!(json["date"], "2024-06-01");
        assert_eq!(json["baseline"]["baseline_moves"], 5);
    }
}
