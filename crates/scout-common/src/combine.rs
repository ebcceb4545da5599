//! Denomination combination planning.
//!
//! Greedy largest-first split of the target amount into available
//! denominations. Quantities always sum exactly to the target, or the
//! plan is `None`.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoucherCombination {
    pub denomination: u32,
    pub quantity: u32,
}

pub fn plan_combination(target: u32, denominations: &[u32]) -> Option<Vec<VoucherCombination>> {
    if target == 0 {
        return None;
    }

    let mut denoms: Vec<u32> = denominations.iter().copied().filter(|d| *d > 0).collect();
    denoms.sort_unstable_by(|a, b| b.cmp(a));
    denoms.dedup();

    let mut remaining = target;
    let mut plan = Vec::new();
    for d in denoms {
        let qty = remaining / d;
        if qty > 0 {
            plan.push(VoucherCombination {
                denomination: d,
                quantity: qty,
            });
            remaining -= qty * d;
        }
    }

    if remaining == 0 && !plan.is_empty() {
        Some(plan)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_single_denomination() {
        let plan = plan_combination(250, &[250, 500]).unwrap();
        assert_eq!(
            plan,
            vec![VoucherCombination {
                denomination: 250,
                quantity: 1
            }]
        );
    }

    #[test]
    fn greedy_mixes_denominations() {
        let plan = plan_combination(1750, &[250, 500, 1000]).unwrap();
        assert_eq!(
            plan,
            vec![
                VoucherCombination {
                    denomination: 1000,
                    quantity: 1
                },
                VoucherCombination {
                    denomination: 500,
                    quantity: 1
                },
                VoucherCombination {
                    denomination: 250,
                    quantity: 1
                },
            ]
        );
        let total: u32 = plan.iter().map(|c| c.denomination * c.quantity).sum();
        assert_eq!(total, 1750);
    }

    #[test]
    fn unreachable_target_is_none() {
        assert_eq!(plan_combination(300, &[250, 500]), None);
        assert_eq!(plan_combination(100, &[]), None);
        assert_eq!(plan_combination(0, &[250]), None);
    }
}
