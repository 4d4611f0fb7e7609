use serde::Serialize;

/// Fixed horizon age bounding every simulation.
pub const FINAL_AGE: u32 = 100;

#[derive(Debug, Clone, Copy)]
pub struct SimulationParameters {
    pub mortgage_duration_years: u32,
    pub mortgage_interest_rate_yearly: f64,
    pub down_payment_percent: f64,
    pub yearly_return_on_savings: f64,
    pub yearly_net_salary_growth: f64,
    pub yearly_house_price_growth: f64,
    pub yearly_rent_increase: f64,
    pub yearly_expenses_increase: f64,
    pub yearly_interest_on_debt: f64,
    pub yearly_inflation: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct InitialConditions {
    pub house_price: f64,
    pub savings: f64,
    pub monthly_rent: f64,
    pub monthly_net_salary: f64,
    pub monthly_expenses_except_rent: f64,
    pub service_charge_yearly: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub max_net_worth: f64,
    pub savings_timeseries: Vec<f64>,
    pub total_net_worth_timeseries: Vec<f64>,
    pub housing_monthly_cost_timeseries: Vec<f64>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeNetWorth {
    pub purchase_age: u32,
    pub max_net_worth: f64,
}

#[derive(Debug, Clone)]
pub struct PurchaseScan {
    pub age_results: Vec<AgeNetWorth>,
    pub best_index: usize,
}
