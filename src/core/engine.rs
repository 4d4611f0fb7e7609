use super::types::{FINAL_AGE, InitialConditions, SimulationParameters, SimulationResult};

#[derive(Debug)]
struct HouseholdState {
    house_price: f64,
    liquid_savings: f64,
    yearly_rent: f64,
    yearly_net_salary: f64,
    yearly_expenses_except_rent: f64,
    service_charge_yearly: f64,
    mortgage_debt_outstanding: f64,
    retired: bool,
}

impl HouseholdState {
    fn new(initial: &InitialConditions) -> Self {
        Self {
            house_price: initial.house_price,
            liquid_savings: initial.savings,
            yearly_rent: initial.monthly_rent * 12.0,
            yearly_net_salary: initial.monthly_net_salary * 12.0,
            yearly_expenses_except_rent: initial.monthly_expenses_except_rent * 12.0,
            service_charge_yearly: initial.service_charge_yearly,
            mortgage_debt_outstanding: 0.0,
            retired: false,
        }
    }
}

pub fn run_simulation(
    parameters: &SimulationParameters,
    initial: &InitialConditions,
    start_age: u32,
    retirement_age: u32,
    purchase_age: u32,
) -> Result<SimulationResult, String> {
    validate_inputs(parameters, initial, start_age, retirement_age)?;
    if purchase_age < start_age {
        return Err("purchase_age must be >= start_age".to_string());
    }
    if purchase_age > FINAL_AGE {
        return Err(format!("purchase_age must be <= {FINAL_AGE}"));
    }

    let horizon_years = (FINAL_AGE - start_age) as usize;
    let mut state = HouseholdState::new(initial);
    let mut savings_timeseries = Vec::with_capacity(horizon_years);
    let mut total_net_worth_timeseries = Vec::with_capacity(horizon_years);
    let mut housing_monthly_cost_timeseries = Vec::with_capacity(horizon_years);

    let mut year = start_age;

    while year < purchase_age {
        year += 1;
        grow_for_one_year(parameters, &mut state, year, retirement_age);
        state.yearly_rent *= 1.0 + parameters.yearly_rent_increase;
        state.liquid_savings +=
            state.yearly_net_salary - state.yearly_rent - state.yearly_expenses_except_rent;
        savings_timeseries.push(state.liquid_savings);
        total_net_worth_timeseries.push(state.liquid_savings);
        housing_monthly_cost_timeseries.push(state.yearly_rent / 12.0);
    }

    if purchase_age < FINAL_AGE {
        let down_payment = parameters.down_payment_percent * state.house_price;
        let principal = state.house_price - down_payment;
        let yearly_payment = yearly_mortgage_payment(
            principal,
            parameters.mortgage_interest_rate_yearly,
            parameters.mortgage_duration_years,
        );
        state.liquid_savings -= down_payment;
        state.mortgage_debt_outstanding = principal;

        let mortgage_end_year = year + parameters.mortgage_duration_years;
        while year < mortgage_end_year && year < FINAL_AGE {
            year += 1;
            grow_for_one_year(parameters, &mut state, year, retirement_age);
            state.service_charge_yearly *= 1.0 + parameters.yearly_inflation;
            let interest_this_year =
                state.mortgage_debt_outstanding * parameters.mortgage_interest_rate_yearly;
            let equity_increment = yearly_payment - interest_this_year;
            state.mortgage_debt_outstanding -= equity_increment;
            state.liquid_savings += state.yearly_net_salary
                - yearly_payment
                - state.yearly_expenses_except_rent
                - state.service_charge_yearly;
            savings_timeseries.push(state.liquid_savings);
            total_net_worth_timeseries
                .push(state.liquid_savings + state.house_price - state.mortgage_debt_outstanding);
            housing_monthly_cost_timeseries.push(yearly_payment / 12.0);
        }

        while year < FINAL_AGE {
            year += 1;
            grow_for_one_year(parameters, &mut state, year, retirement_age);
            state.liquid_savings +=
                state.yearly_net_salary - state.yearly_expenses_except_rent;
            savings_timeseries.push(state.liquid_savings);
            total_net_worth_timeseries.push(state.liquid_savings + state.house_price);
            housing_monthly_cost_timeseries.push(0.0);
        }
    }

    deflate_to_present_value(parameters.yearly_inflation, &mut savings_timeseries);
    deflate_to_present_value(parameters.yearly_inflation, &mut total_net_worth_timeseries);
    deflate_to_present_value(parameters.yearly_inflation, &mut housing_monthly_cost_timeseries);

    // Non-empty: start_age < FINAL_AGE is enforced above, and every simulated
    // year appends exactly one entry to each series.
    let max_net_worth = total_net_worth_timeseries
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);

    Ok(SimulationResult {
        max_net_worth,
        savings_timeseries,
        total_net_worth_timeseries,
        housing_monthly_cost_timeseries,
    })
}

pub fn compute_max_net_worth(
    parameters: &SimulationParameters,
    initial: &InitialConditions,
    start_age: u32,
    retirement_age: u32,
    purchase_age: u32,
) -> Result<f64, String> {
    let result = run_simulation(parameters, initial, start_age, retirement_age, purchase_age)?;
    Ok(result.max_net_worth)
}

fn grow_for_one_year(
    parameters: &SimulationParameters,
    state: &mut HouseholdState,
    year: u32,
    retirement_age: u32,
) {
    if state.liquid_savings > 0.0 {
        state.liquid_savings *= 1.0 + parameters.yearly_return_on_savings;
    } else {
        // A negative balance compounds at the debt rate, deepening the hole.
        state.liquid_savings *= 1.0 + parameters.yearly_interest_on_debt;
    }
    state.house_price *= 1.0 + parameters.yearly_house_price_growth;
    state.yearly_net_salary *= 1.0 + parameters.yearly_net_salary_growth;
    state.yearly_expenses_except_rent *= 1.0 + parameters.yearly_expenses_increase;
    if year > retirement_age {
        state.retired = true;
    }
    if state.retired {
        state.yearly_net_salary = 0.0;
    }
}

fn yearly_mortgage_payment(principal: f64, yearly_rate: f64, duration_years: u32) -> f64 {
    if yearly_rate.abs() < 1e-9 {
        // Straight-line repayment; the annuity denominator degenerates at r = 0.
        return principal / duration_years as f64;
    }
    let compound = (1.0 + yearly_rate).powi(duration_years as i32);
    principal * yearly_rate * compound / (compound - 1.0)
}

fn deflate_to_present_value(yearly_inflation: f64, series: &mut [f64]) {
    for (i, value) in series.iter_mut().enumerate() {
        *value /= (1.0 + yearly_inflation).powi(i as i32);
    }
}

pub(super) fn validate_inputs(
    parameters: &SimulationParameters,
    initial: &InitialConditions,
    start_age: u32,
    retirement_age: u32,
) -> Result<(), String> {
    if parameters.mortgage_duration_years == 0 {
        return Err("mortgage_duration_years must be > 0".to_string());
    }

    for (name, rate) in [
        (
            "mortgage_interest_rate_yearly",
            parameters.mortgage_interest_rate_yearly,
        ),
        (
            "yearly_return_on_savings",
            parameters.yearly_return_on_savings,
        ),
        (
            "yearly_net_salary_growth",
            parameters.yearly_net_salary_growth,
        ),
        (
            "yearly_house_price_growth",
            parameters.yearly_house_price_growth,
        ),
        ("yearly_rent_increase", parameters.yearly_rent_increase),
        (
            "yearly_expenses_increase",
            parameters.yearly_expenses_increase,
        ),
        ("yearly_interest_on_debt", parameters.yearly_interest_on_debt),
        ("yearly_inflation", parameters.yearly_inflation),
    ] {
        if !rate.is_finite() || rate <= -1.0 {
            return Err(format!("{name} must be a finite fraction > -1"));
        }
    }

    if parameters.mortgage_interest_rate_yearly < 0.0 {
        return Err("mortgage_interest_rate_yearly must be >= 0".to_string());
    }
    if parameters.yearly_interest_on_debt < 0.0 {
        return Err("yearly_interest_on_debt must be >= 0".to_string());
    }
    if !parameters.down_payment_percent.is_finite()
        || !(0.0..1.0).contains(&parameters.down_payment_percent)
    {
        return Err("down_payment_percent must be a fraction in [0, 1)".to_string());
    }

    for (name, value) in [
        ("house_price", initial.house_price),
        ("savings", initial.savings),
        ("monthly_rent", initial.monthly_rent),
        ("monthly_net_salary", initial.monthly_net_salary),
        (
            "monthly_expenses_except_rent",
            initial.monthly_expenses_except_rent,
        ),
        ("service_charge_yearly", initial.service_charge_yearly),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(format!("{name} must be a finite non-negative amount"));
        }
    }

    if retirement_age < start_age {
        return Err("retirement_age must be >= start_age".to_string());
    }
    if start_age >= FINAL_AGE {
        return Err(format!(
            "start_age must be < {FINAL_AGE}; the horizon would contain no simulated years"
        ));
    }

    Ok(())
}
