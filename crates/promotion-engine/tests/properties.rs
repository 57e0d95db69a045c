//! 选择语义的性质测试

use promotion_engine::{
    ConditionMatcher, ConditionSpec, Player, RangeSpec, Rule, RuleLoader, RuleSet, Scalar, Selector,
};
use proptest::prelude::*;
use serde_json::json;

/// 生成 (优先级, 是否启用) 列表，规则均无条件
fn rule_specs() -> impl Strategy<Value = Vec<(i64, bool)>> {
    prop::collection::vec((-5i64..5, any::<bool>()), 1..20)
}

fn to_yaml(specs: &[(i64, bool)]) -> String {
    let rules: Vec<_> = specs
        .iter()
        .enumerate()
        .map(|(i, (priority, active))| {
            json!({
                "id": format!("rule-{}", i),
                "priority": priority,
                "active": active,
                "promotion": { "index": i },
            })
        })
        .collect();
    json!({ "rules": rules }).to_string()
}

fn index_of(id: &str) -> usize {
    id.trim_start_matches("rule-").parse().unwrap()
}

proptest! {
    #[test]
    fn loaded_rules_are_ordered_and_stable(specs in rule_specs()) {
        let rules = RuleLoader::load_from_str(&to_yaml(&specs)).unwrap();

        // 未启用的规则不会出现
        prop_assert!(rules.iter().all(|r| r.active));
        prop_assert_eq!(rules.len(), specs.iter().filter(|(_, a)| *a).count());

        for pair in rules.windows(2) {
            prop_assert!(pair[0].priority >= pair[1].priority);
            if pair[0].priority == pair[1].priority {
                prop_assert!(index_of(&pair[0].id) < index_of(&pair[1].id));
            }
        }
    }

    #[test]
    fn unconditional_rules_select_highest_priority_earliest(specs in rule_specs()) {
        let rules = RuleLoader::load_from_str(&to_yaml(&specs)).unwrap();
        let set = RuleSet::new(rules, 1);
        let result = Selector::select(&set, &Player::new());

        let best = specs
            .iter()
            .enumerate()
            .filter(|(_, (_, active))| *active)
            .max_by(|(ia, (pa, _)), (ib, (pb, _))| pa.cmp(pb).then(ib.cmp(ia)));

        match best {
            Some((index, _)) => prop_assert_eq!(result.unwrap().rule_id, format!("rule-{}", index)),
            None => prop_assert!(result.is_none()),
        }
    }

    #[test]
    fn reload_of_same_document_is_identical(specs in rule_specs()) {
        let yaml = to_yaml(&specs);
        let first = RuleLoader::load_from_str(&yaml).unwrap();
        let second = RuleLoader::load_from_str(&yaml).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn range_matches_iff_within_bounds(a in -1000i64..1000, b in -1000i64..1000, v in -2000i64..2000) {
        let spec = ConditionSpec::Range(RangeSpec::between(a, b));
        prop_assert_eq!(
            ConditionMatcher::matches(&spec, Some(&Scalar::from(v))),
            a <= v && v <= b
        );

        let lower = ConditionSpec::Range(RangeSpec::at_least(a));
        prop_assert_eq!(ConditionMatcher::matches(&lower, Some(&Scalar::from(v))), a <= v);

        let upper = ConditionSpec::Range(RangeSpec::at_most(b));
        prop_assert_eq!(ConditionMatcher::matches(&upper, Some(&Scalar::from(v))), v <= b);
    }

    #[test]
    fn set_matches_iff_member(values in prop::collection::vec(0i64..20, 0..6), v in 0i64..20) {
        let spec = ConditionSpec::one_of(values.clone());
        prop_assert_eq!(
            ConditionMatcher::matches(&spec, Some(&Scalar::from(v))),
            values.contains(&v)
        );
        // 同值字符串不匹配
        prop_assert!(!ConditionMatcher::matches(&spec, Some(&Scalar::from(v.to_string()))));
    }

    #[test]
    fn higher_priority_wins_when_both_match(p1 in 1i64..1000, gap in 1i64..1000) {
        let p2 = p1 - gap;
        let high = Rule::new("high", p1, json!({}))
            .with_condition("country", ConditionSpec::exact("US"));
        let low = Rule::new("low", p2, json!({}));

        let yaml = json!({ "rules": [low, high] }).to_string();
        let set = RuleSet::new(RuleLoader::load_from_str(&yaml).unwrap(), 1);

        let player = Player::new().with("country", "US");
        prop_assert_eq!(Selector::select(&set, &player).unwrap().rule_id, "high");
    }
}
