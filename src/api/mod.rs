use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    AgeNetWorth, FINAL_AGE, InitialConditions, SimulationParameters, run_simulation,
    scan_purchase_ages,
};

#[derive(Parser, Debug)]
#[command(
    name = "rentbuy",
    about = "Rent-vs-buy projection engine (three life phases + purchase-age optimizer)"
)]
struct Cli {
    #[arg(long, default_value_t = 30)]
    start_age: u32,
    #[arg(long, default_value_t = 65)]
    retirement_age: u32,
    #[arg(
        long,
        help = "Purchase age to simulate; defaults to the optimizer's recommendation"
    )]
    purchase_age: Option<u32>,
    #[arg(long, default_value_t = 25)]
    mortgage_duration_years: u32,
    #[arg(
        long,
        default_value_t = 6.0,
        help = "Nominal yearly mortgage interest rate in percent"
    )]
    mortgage_interest_rate: f64,
    #[arg(
        long,
        default_value_t = 10.0,
        help = "Down payment as percent of the house price at purchase"
    )]
    down_payment: f64,
    #[arg(
        long,
        default_value_t = 4.0,
        help = "Yearly return on a positive savings balance in percent"
    )]
    return_on_savings: f64,
    #[arg(long, default_value_t = 3.0, help = "Yearly net salary growth in percent")]
    salary_growth: f64,
    #[arg(long, default_value_t = 3.0, help = "Yearly house price growth in percent")]
    house_price_growth: f64,
    #[arg(long, default_value_t = 3.0, help = "Yearly rent increase in percent")]
    rent_increase: f64,
    #[arg(long, default_value_t = 3.0, help = "Yearly expenses increase in percent")]
    expenses_increase: f64,
    #[arg(
        long,
        default_value_t = 15.0,
        help = "Yearly interest charged on a negative savings balance in percent"
    )]
    interest_on_debt: f64,
    #[arg(
        long,
        default_value_t = 2.0,
        help = "Yearly inflation in percent; deflates results to present value"
    )]
    inflation: f64,
    #[arg(long, default_value_t = 325_000.0)]
    house_price: f64,
    #[arg(long, default_value_t = 34_000.0)]
    savings: f64,
    #[arg(long, default_value_t = 1_200.0)]
    monthly_rent: f64,
    #[arg(long, default_value_t = 2_600.0)]
    monthly_net_salary: f64,
    #[arg(long, default_value_t = 1_000.0)]
    monthly_expenses: f64,
    #[arg(long, default_value_t = 2_200.0)]
    service_charge_yearly: f64,
}

#[derive(Debug)]
struct ApiRequest {
    parameters: SimulationParameters,
    initial_conditions: InitialConditions,
    start_age: u32,
    retirement_age: u32,
    purchase_age_override: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    start_age: Option<u32>,
    retirement_age: Option<u32>,
    purchase_age: Option<u32>,

    mortgage_duration_years: Option<u32>,
    mortgage_interest_rate: Option<f64>,
    down_payment: Option<f64>,

    return_on_savings: Option<f64>,
    salary_growth: Option<f64>,
    house_price_growth: Option<f64>,
    rent_increase: Option<f64>,
    expenses_increase: Option<f64>,
    interest_on_debt: Option<f64>,
    inflation: Option<f64>,

    house_price: Option<f64>,
    savings: Option<f64>,
    monthly_rent: Option<f64>,
    monthly_net_salary: Option<f64>,
    monthly_expenses: Option<f64>,
    service_charge_yearly: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    start_age: u32,
    retirement_age: u32,
    final_age: u32,
    optimal_purchase_age: u32,
    purchase_age: u32,
    max_net_worth: f64,
    age_scan: Vec<AgeNetWorth>,
    savings_timeseries: Vec<f64>,
    total_net_worth_timeseries: Vec<f64>,
    housing_monthly_cost_timeseries: Vec<f64>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_inputs(cli: Cli) -> Result<ApiRequest, String> {
    if cli.retirement_age < cli.start_age {
        return Err("--retirement-age must be >= --start-age".to_string());
    }

    if cli.start_age >= FINAL_AGE {
        return Err(format!("--start-age must be < {FINAL_AGE}"));
    }

    if cli.mortgage_duration_years == 0 {
        return Err("--mortgage-duration-years must be > 0".to_string());
    }

    if !cli.mortgage_interest_rate.is_finite() || cli.mortgage_interest_rate < 0.0 {
        return Err("--mortgage-interest-rate must be >= 0".to_string());
    }

    if !(0.0..100.0).contains(&cli.down_payment) {
        return Err("--down-payment must be between 0 and 100 (exclusive)".to_string());
    }

    if !cli.interest_on_debt.is_finite() || cli.interest_on_debt < 0.0 {
        return Err("--interest-on-debt must be >= 0".to_string());
    }

    for (name, rate) in [
        ("--return-on-savings", cli.return_on_savings),
        ("--salary-growth", cli.salary_growth),
        ("--house-price-growth", cli.house_price_growth),
        ("--rent-increase", cli.rent_increase),
        ("--expenses-increase", cli.expenses_increase),
        ("--inflation", cli.inflation),
    ] {
        if !rate.is_finite() || rate <= -100.0 {
            return Err(format!("{name} must be a finite percentage > -100"));
        }
    }

    for (name, value) in [
        ("--house-price", cli.house_price),
        ("--savings", cli.savings),
        ("--monthly-rent", cli.monthly_rent),
        ("--monthly-net-salary", cli.monthly_net_salary),
        ("--monthly-expenses", cli.monthly_expenses),
        ("--service-charge-yearly", cli.service_charge_yearly),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(format!("{name} must be >= 0"));
        }
    }

    if let Some(age) = cli.purchase_age {
        if age < cli.start_age {
            return Err("--purchase-age must be >= --start-age".to_string());
        }
        if age > FINAL_AGE {
            return Err(format!("--purchase-age must be <= {FINAL_AGE}"));
        }
    }

    Ok(ApiRequest {
        parameters: SimulationParameters {
            mortgage_duration_years: cli.mortgage_duration_years,
            mortgage_interest_rate_yearly: cli.mortgage_interest_rate / 100.0,
            down_payment_percent: cli.down_payment / 100.0,
            yearly_return_on_savings: cli.return_on_savings / 100.0,
            yearly_net_salary_growth: cli.salary_growth / 100.0,
            yearly_house_price_growth: cli.house_price_growth / 100.0,
            yearly_rent_increase: cli.rent_increase / 100.0,
            yearly_expenses_increase: cli.expenses_increase / 100.0,
            yearly_interest_on_debt: cli.interest_on_debt / 100.0,
            yearly_inflation: cli.inflation / 100.0,
        },
        initial_conditions: InitialConditions {
            house_price: cli.house_price,
            savings: cli.savings,
            monthly_rent: cli.monthly_rent,
            monthly_net_salary: cli.monthly_net_salary,
            monthly_expenses_except_rent: cli.monthly_expenses,
            service_charge_yearly: cli.service_charge_yearly,
        },
        start_age: cli.start_age,
        retirement_age: cli.retirement_age,
        purchase_age_override: cli.purchase_age,
    })
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    println!("rentbuy HTTP API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/api/simulate");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    match simulate_from_request(&request) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

fn simulate_from_request(request: &ApiRequest) -> Result<SimulateResponse, String> {
    let scan = scan_purchase_ages(
        &request.parameters,
        &request.initial_conditions,
        request.start_age,
        request.retirement_age,
    )?;
    let optimal_purchase_age = scan.age_results[scan.best_index].purchase_age;
    let purchase_age = request.purchase_age_override.unwrap_or(optimal_purchase_age);

    let result = run_simulation(
        &request.parameters,
        &request.initial_conditions,
        request.start_age,
        request.retirement_age,
        purchase_age,
    )?;

    Ok(SimulateResponse {
        start_age: request.start_age,
        retirement_age: request.retirement_age,
        final_age: FINAL_AGE,
        optimal_purchase_age,
        purchase_age,
        max_net_worth: result.max_net_worth,
        age_scan: scan.age_results,
        savings_timeseries: result.savings_timeseries,
        total_net_worth_timeseries: result.total_net_worth_timeseries,
        housing_monthly_cost_timeseries: result.housing_monthly_cost_timeseries,
    })
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: SimulatePayload) -> Result<ApiRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.start_age {
        cli.start_age = v;
    }
    if let Some(v) = payload.retirement_age {
        cli.retirement_age = v;
    }
    if let Some(v) = payload.purchase_age {
        cli.purchase_age = Some(v);
    }

    if let Some(v) = payload.mortgage_duration_years {
        cli.mortgage_duration_years = v;
    }
    if let Some(v) = payload.mortgage_interest_rate {
        cli.mortgage_interest_rate = v;
    }
    if let Some(v) = payload.down_payment {
        cli.down_payment = v;
    }

    if let Some(v) = payload.return_on_savings {
        cli.return_on_savings = v;
    }
    if let Some(v) = payload.salary_growth {
        cli.salary_growth = v;
    }
    if let Some(v) = payload.house_price_growth {
        cli.house_price_growth = v;
    }
    if let Some(v) = payload.rent_increase {
        cli.rent_increase = v;
    }
    if let Some(v) = payload.expenses_increase {
        cli.expenses_increase = v;
    }
    if let Some(v) = payload.interest_on_debt {
        cli.interest_on_debt = v;
    }
    if let Some(v) = payload.inflation {
        cli.inflation = v;
    }

    if let Some(v) = payload.house_price {
        cli.house_price = v;
    }
    if let Some(v) = payload.savings {
        cli.savings = v;
    }
    if let Some(v) = payload.monthly_rent {
        cli.monthly_rent = v;
    }
    if let Some(v) = payload.monthly_net_salary {
        cli.monthly_net_salary = v;
    }
    if let Some(v) = payload.monthly_expenses {
        cli.monthly_expenses = v;
    }
    if let Some(v) = payload.service_charge_yearly {
        cli.service_charge_yearly = v;
    }

    build_inputs(cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        start_age: 30,
        retirement_age: 65,
        purchase_age: None,
        mortgage_duration_years: 25,
        mortgage_interest_rate: 6.0,
        down_payment: 10.0,
        return_on_savings: 4.0,
        salary_growth: 3.0,
        house_price_growth: 3.0,
        rent_increase: 3.0,
        expenses_increase: 3.0,
        interest_on_debt: 15.0,
        inflation: 2.0,
        house_price: 325_000.0,
        savings: 34_000.0,
        monthly_rent: 1_200.0,
        monthly_net_salary: 2_600.0,
        monthly_expenses: 1_000.0,
        service_charge_yearly: 2_200.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_cli() -> Cli {
        default_cli_for_api()
    }

    #[test]
    fn build_inputs_converts_percentages_to_fractions() {
        let request = build_inputs(sample_cli()).expect("valid inputs");
        assert_approx(request.parameters.mortgage_interest_rate_yearly, 0.06);
        assert_approx(request.parameters.down_payment_percent, 0.10);
        assert_approx(request.parameters.yearly_return_on_savings, 0.04);
        assert_approx(request.parameters.yearly_interest_on_debt, 0.15);
        assert_approx(request.parameters.yearly_inflation, 0.02);
        assert_eq!(request.parameters.mortgage_duration_years, 25);
        assert_approx(request.initial_conditions.monthly_rent, 1_200.0);
    }

    #[test]
    fn build_inputs_rejects_retirement_before_start() {
        let mut cli = sample_cli();
        cli.retirement_age = 29;
        let err = build_inputs(cli).expect_err("must reject retirement before start");
        assert!(err.contains("--retirement-age"));
    }

    #[test]
    fn build_inputs_rejects_full_down_payment() {
        let mut cli = sample_cli();
        cli.down_payment = 100.0;
        let err = build_inputs(cli).expect_err("must reject 100% down payment");
        assert!(err.contains("--down-payment"));
    }

    #[test]
    fn build_inputs_rejects_purchase_age_outside_horizon() {
        let mut cli = sample_cli();
        cli.purchase_age = Some(29);
        let err = build_inputs(cli).expect_err("must reject purchase before start");
        assert!(err.contains("--purchase-age"));

        let mut cli = sample_cli();
        cli.purchase_age = Some(FINAL_AGE + 1);
        let err = build_inputs(cli).expect_err("must reject purchase past horizon");
        assert!(err.contains("--purchase-age"));
    }

    #[test]
    fn build_inputs_rejects_start_age_at_the_horizon() {
        let mut cli = sample_cli();
        cli.start_age = FINAL_AGE;
        cli.retirement_age = FINAL_AGE;
        let err = build_inputs(cli).expect_err("must reject empty horizon");
        assert!(err.contains("--start-age"));
    }

    #[test]
    fn api_request_from_json_parses_web_keys() {
        let json = r#"{
          "startAge": 32,
          "retirementAge": 67,
          "purchaseAge": 40,
          "mortgageDurationYears": 20,
          "mortgageInterestRate": 4.5,
          "downPayment": 15,
          "returnOnSavings": 7,
          "interestOnDebt": 10,
          "inflation": 4,
          "housePrice": 280000,
          "savings": 50000,
          "monthlyRent": 950,
          "monthlyNetSalary": 3100,
          "monthlyExpenses": 1200,
          "serviceChargeYearly": 1800
        }"#;
        let request = api_request_from_json(json).expect("json should parse");

        assert_eq!(request.start_age, 32);
        assert_eq!(request.retirement_age, 67);
        assert_eq!(request.purchase_age_override, Some(40));
        assert_eq!(request.parameters.mortgage_duration_years, 20);
        assert_approx(request.parameters.mortgage_interest_rate_yearly, 0.045);
        assert_approx(request.parameters.down_payment_percent, 0.15);
        assert_approx(request.parameters.yearly_return_on_savings, 0.07);
        assert_approx(request.parameters.yearly_interest_on_debt, 0.10);
        assert_approx(request.parameters.yearly_inflation, 0.04);
        assert_approx(request.initial_conditions.house_price, 280_000.0);
        assert_approx(request.initial_conditions.savings, 50_000.0);
        assert_approx(request.initial_conditions.monthly_rent, 950.0);
        assert_approx(request.initial_conditions.monthly_net_salary, 3_100.0);
        assert_approx(request.initial_conditions.monthly_expenses_except_rent, 1_200.0);
        assert_approx(request.initial_conditions.service_charge_yearly, 1_800.0);
    }

    #[test]
    fn simulate_response_serialization_contains_expected_fields() {
        let request = build_inputs(sample_cli()).expect("valid inputs");
        let response = simulate_from_request(&request).expect("simulation must run");
        let json = serde_json::to_string(&response).expect("response should serialize");

        assert!(json.contains("\"optimalPurchaseAge\""));
        assert!(json.contains("\"purchaseAge\""));
        assert!(json.contains("\"maxNetWorth\""));
        assert!(json.contains("\"ageScan\""));
        assert!(json.contains("\"savingsTimeseries\""));
        assert!(json.contains("\"totalNetWorthTimeseries\""));
        assert!(json.contains("\"housingMonthlyCostTimeseries\""));
        assert!(json.contains("\"finalAge\":100"));
    }

    #[test]
    fn purchase_age_override_replaces_the_optimizer_choice() {
        let mut cli = sample_cli();
        cli.purchase_age = Some(50);
        let request = build_inputs(cli).expect("valid inputs");
        let response = simulate_from_request(&request).expect("simulation must run");

        assert_eq!(response.purchase_age, 50);
        assert!((30..=FINAL_AGE).contains(&response.optimal_purchase_age));
        assert_eq!(
            response.savings_timeseries.len(),
            (FINAL_AGE - response.start_age) as usize
        );
        assert_eq!(
            response.age_scan.len(),
            (FINAL_AGE - response.start_age + 1) as usize
        );
    }

    #[test]
    fn default_request_simulates_the_optimizer_recommendation() {
        let request = build_inputs(sample_cli()).expect("valid inputs");
        let response = simulate_from_request(&request).expect("simulation must run");

        assert_eq!(response.purchase_age, response.optimal_purchase_age);
        let series_max = response
            .total_net_worth_timeseries
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        assert!((response.max_net_worth - series_max).abs() <= 1e-9 * series_max.abs().max(1.0));
    }
}
