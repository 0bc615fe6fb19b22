//! Scenario tests for rule evaluation across multiple calls
//!
//! These exercise the engine together with a shared cooldown ledger the way
//! request handlers drive it: same reading, repeated evaluations, manual resets.

#[cfg(test)]
mod evaluation_scenarios {
    use crate::alerting::{
        AlertRule, Category, Condition, CooldownLedger, EvaluationEngine, Operator, Severity,
    };
    use crate::models::{CpuReading, DiskReading, MemoryReading, MetricsReading, NetworkInterface};
    use std::sync::Arc;

    fn reading(cpu: f64, memory: f64, disk: f64) -> MetricsReading {
        MetricsReading {
            cpu: CpuReading {
                usage: cpu,
                cores: 8,
            },
            memory: MemoryReading {
                usage: memory,
                ..Default::default()
            },
            disk: DiskReading {
                usage: disk,
                ..Default::default()
            },
            network: vec![NetworkInterface {
                name: "eth0".to_string(),
                rx_bytes: 2_000_000,
                tx_bytes: 500_000,
            }],
        }
    }

    fn rule(id: &str, category: Category, metric: &str, operator: Operator, threshold: f64) -> AlertRule {
        AlertRule::new(
            id,
            id,
            category,
            Condition::new(metric, operator, threshold),
            Severity::Warning,
        )
        .with_cooldown(300)
    }

    fn engine() -> EvaluationEngine {
        EvaluationEngine::new(Arc::new(CooldownLedger::new()))
    }

    fn fired_ids(alerts: &[crate::alerting::GeneratedAlert]) -> Vec<&str> {
        alerts.iter().map(|a| a.rule_id.as_str()).collect()
    }

    #[test]
    fn test_end_to_end_cooldown_and_single_reset() {
        let engine = engine();
        let reading = reading(90.0, 95.0, 10.0);
        let rules = vec![
            rule("cpu-high", Category::Cpu, "usage", Operator::GreaterThan, 80.0),
            rule("mem-crit", Category::Memory, "usage", Operator::GreaterThan, 90.0),
        ];

        let first = engine.evaluate_metrics(&reading, &rules);
        assert_eq!(fired_ids(&first), vec!["cpu-high", "mem-crit"]);

        let second = engine.evaluate_metrics(&reading, &rules);
        assert!(second.is_empty());

        assert!(engine.reset_rule_cooldown("cpu-high"));
        let third = engine.evaluate_metrics(&reading, &rules);
        assert_eq!(fired_ids(&third), vec!["cpu-high"]);
    }

    #[test]
    fn test_reset_all_cooldowns_restores_firing() {
        let engine = engine();
        let reading = reading(90.0, 95.0, 10.0);
        let rules = vec![
            rule("cpu-high", Category::Cpu, "usage", Operator::GreaterThan, 80.0),
            rule("mem-crit", Category::Memory, "usage", Operator::GreaterThan, 90.0),
        ];

        assert_eq!(engine.evaluate_metrics(&reading, &rules).len(), 2);
        assert!(engine.evaluate_metrics(&reading, &rules).is_empty());

        engine.reset_cooldowns();
        assert_eq!(engine.evaluate_metrics(&reading, &rules).len(), 2);
    }

    #[test]
    fn test_multi_rule_independence_preserves_order() {
        let engine = engine();
        let reading = reading(50.0, 95.0, 99.0);
        let rules = vec![
            rule("disk-full", Category::Disk, "usage", Operator::GreaterEqual, 95.0),
            rule("cpu-high", Category::Cpu, "usage", Operator::GreaterThan, 80.0),
            rule("rx-big", Category::Network, "rxBytes", Operator::GreaterThan, 1_000_000.0),
            rule("mem-crit", Category::Memory, "usage", Operator::GreaterThan, 90.0),
            rule("tx-small", Category::Network, "txBytes", Operator::LessThan, 100.0),
        ];

        let alerts = engine.evaluate_metrics(&reading, &rules);
        assert_eq!(fired_ids(&alerts), vec!["disk-full", "rx-big", "mem-crit"]);
    }

    #[test]
    fn test_one_unresolvable_rule_does_not_block_others() {
        let engine = engine();
        let reading = reading(99.0, 10.0, 10.0);
        let rules = vec![
            rule("containers", Category::Container, "running", Operator::LessThan, 3.0),
            rule("typo", Category::Cpu, "usgae", Operator::GreaterThan, 1.0),
            rule("cpu-high", Category::Cpu, "usage", Operator::GreaterThan, 80.0),
        ];

        let alerts = engine.evaluate_metrics(&reading, &rules);
        assert_eq!(fired_ids(&alerts), vec!["cpu-high"]);
    }

    #[test]
    fn test_disabled_rule_excluded_even_far_over_threshold() {
        let engine = engine();
        let rules = vec![
            rule("cpu-high", Category::Cpu, "usage", Operator::GreaterThan, 1.0).disabled(),
        ];

        for _ in 0..3 {
            assert!(engine
                .evaluate_metrics(&reading(100.0, 0.0, 0.0), &rules)
                .is_empty());
        }
        assert!(engine.ledger().is_empty());
    }

    #[test]
    fn test_cooldown_expires_with_clock() {
        let engine = engine();
        let reading = reading(90.0, 0.0, 0.0);
        let rules = vec![rule("cpu-high", Category::Cpu, "usage", Operator::GreaterThan, 80.0)];

        let t0 = 1_700_000_000_000;
        assert_eq!(engine.evaluate_metrics_at(&reading, &rules, t0).len(), 1);
        assert!(engine
            .evaluate_metrics_at(&reading, &rules, t0 + 120_000)
            .is_empty());
        let later = engine.evaluate_metrics_at(&reading, &rules, t0 + 300_000);
        assert_eq!(later.len(), 1);
        assert_eq!(later[0].triggered_at, t0 + 300_000);
    }

    #[test]
    fn test_engines_sharing_a_ledger_share_cooldowns() {
        let ledger = Arc::new(CooldownLedger::new());
        let first = EvaluationEngine::new(Arc::clone(&ledger));
        let second = EvaluationEngine::new(Arc::clone(&ledger));
        let reading = reading(90.0, 0.0, 0.0);
        let rules = vec![rule("cpu-high", Category::Cpu, "usage", Operator::GreaterThan, 80.0)];

        assert_eq!(first.evaluate_metrics(&reading, &rules).len(), 1);
        assert!(second.evaluate_metrics(&reading, &rules).is_empty());
    }
}
