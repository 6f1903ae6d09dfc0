use serde::{Deserialize, Serialize};

/// Fixed commission split applied at payment approval:
/// 60% owner, 20% dev pool (even split), 20% seller.
/// All amounts are integer centavos. Owner and seller shares are computed
/// by percentage; the dev pool takes the exact remainder so the three
/// parts always sum to the full price. Spare centavos from an uneven pool
/// division go to the earlier devs in the list.
pub const OWNER_PCT: i64 = 60;
pub const SELLER_PCT: i64 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionSplit {
    pub owner: i64,
    pub seller: i64,
    pub devs_total: i64,
    pub dev_shares: Vec<i64>,
}

pub fn split(price: i64, dev_count: usize) -> CommissionSplit {
    let owner = price * OWNER_PCT / 100;
    let seller = price * SELLER_PCT / 100;
    let devs_total = price - owner - seller;

    let mut dev_shares = Vec::with_capacity(dev_count);
    if dev_count > 0 {
        let base = devs_total / dev_count as i64;
        let mut spare = devs_total % dev_count as i64;
        for _ in 0..dev_count {
            let extra = if spare > 0 { 1 } else { 0 };
            spare -= extra;
            dev_shares.push(base + extra);
        }
    }

    CommissionSplit {
        owner,
        seller,
        devs_total,
        dev_shares,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monthly_price_splits_sixty_twenty_twenty() {
        // price 400 MXN: owner 240, devs 80 total, seller 80
        let s = split(40_000, 2);
        assert_eq!(s.owner, 24_000);
        assert_eq!(s.devs_total, 8_000);
        assert_eq!(s.seller, 8_000);
        assert_eq!(s.dev_shares, vec![4_000, 4_000]);
    }

    #[test]
    fn weekly_price_scenario() {
        // price 150 MXN, two devs: seller 30, owner 90, each dev 15
        let s = split(15_000, 2);
        assert_eq!(s.seller, 3_000);
        assert_eq!(s.owner, 9_000);
        assert_eq!(s.dev_shares, vec![1_500, 1_500]);
    }

    #[test]
    fn split_always_sums_to_price() {
        for price in [3_000, 5_000, 9_000, 15_000, 20_000, 25_000, 35_000, 40_000, 12_345] {
            for devs in 1..=4usize {
                let s = split(price, devs);
                let dev_sum: i64 = s.dev_shares.iter().sum();
                assert_eq!(s.owner + s.seller + dev_sum, price, "price={price} devs={devs}");
                assert_eq!(dev_sum, s.devs_total);
            }
        }
    }

    #[test]
    fn uneven_pool_gives_spare_centavos_to_earlier_devs() {
        let s = split(12_345, 2);
        // pool = 12345 - 7407 - 2469 = 2469
        assert_eq!(s.devs_total, 2_469);
        assert_eq!(s.dev_shares, vec![1_235, 1_234]);
    }

    #[test]
    fn empty_dev_list_keeps_pool_unassigned() {
        let s = split(10_000, 0);
        assert_eq!(s.devs_total, 2_000);
        assert!(s.dev_shares.is_empty());
    }
}
