use super::engine::compute_max_net_worth;
use super::types::{AgeNetWorth, FINAL_AGE, InitialConditions, PurchaseScan, SimulationParameters};

pub fn scan_purchase_ages(
    parameters: &SimulationParameters,
    initial: &InitialConditions,
    start_age: u32,
    retirement_age: u32,
) -> Result<PurchaseScan, String> {
    let mut age_results = Vec::with_capacity((FINAL_AGE - start_age + 1) as usize);
    for purchase_age in start_age..=FINAL_AGE {
        let max_net_worth =
            compute_max_net_worth(parameters, initial, start_age, retirement_age, purchase_age)?;
        age_results.push(AgeNetWorth {
            purchase_age,
            max_net_worth,
        });
    }

    // Strict comparison keeps the earliest age when several candidates tie.
    let mut best_index = 0;
    for (index, candidate) in age_results.iter().enumerate().skip(1) {
        if candidate.max_net_worth > age_results[best_index].max_net_worth {
            best_index = index;
        }
    }

    Ok(PurchaseScan {
        age_results,
        best_index,
    })
}

pub fn find_optimal_purchase_age(
    parameters: &SimulationParameters,
    initial: &InitialConditions,
    start_age: u32,
    retirement_age: u32,
) -> Result<u32, String> {
    let scan = scan_purchase_ages(parameters, initial, start_age, retirement_age)?;
    Ok(scan.age_results[scan.best_index].purchase_age)
}
