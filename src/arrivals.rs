// LTA DataMall "Bus Arrival" v3:
// https://datamall.lta.gov.sg/content/dam/datamall/datasets/LTA_DataMall_API_User_Guide.pdf
//
// GET .../BusArrival?BusStopCode=83139 with an AccountKey header yields one
// entry per service calling at the stop, each with up to three upcoming
// buses. Slots with no prediction come back with every field set to "".
extern crate chrono;
extern crate reqwest;
extern crate serde;
extern crate serde_json;
extern crate serde_with;

use crate::result;
use crate::scheduler;
use crate::structs::{FetchStatus, ServiceArrival, StopArrivals};
use serde_with::{NoneAsEmptyString, serde_as};

pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// (url, account key) -> response. Swapped out in tests.
pub type FetchFn = fn(&str, &str) -> result::BusDashResult<RawResponse>;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct LtaBusArrivalResponse {
    #[serde(default)]
    services: Vec<LtaService>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct LtaService {
    service_no: String,
    next_bus: Option<LtaNextBus>,
    next_bus2: Option<LtaNextBus>,
    next_bus3: Option<LtaNextBus>,
}

#[serde_as]
#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct LtaNextBus {
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    estimated_arrival: Option<String>,

    #[serde(rename = "Type", default = "unknown_vehicle_type")]
    vehicle_type: String,
}

fn unknown_vehicle_type() -> String {
    return "Other".to_string();
}

pub fn stop_url(api_url: &str, stop_code: &str) -> String {
    return format!("{}?BusStopCode={}", api_url, stop_code);
}

/// Never fails: whatever goes wrong ends up as an empty list plus a
/// `FetchStatus` saying why. Minutes are counted from when the response
/// came back, not from when the refresh started.
pub fn fetch_stop(api_url: &str, api_key: &str, stop_code: &str,
                  clock: &dyn scheduler::Clock,
                  fetch_fn: FetchFn) -> StopArrivals {
    let url = stop_url(api_url, stop_code);
    debug!("Fetching {}", url);

    let response = match fetch_fn(&url, api_key) {
        Ok(response) => response,
        Err(err) => {
            warn!("Fetching stop {} failed: {}", stop_code, err);
            return StopArrivals::failed(FetchStatus::Failed(format!("{}", err)));
        }
    };

    if response.status != 200 {
        warn!("Stop {} returned HTTP {}", stop_code, response.status);
        return StopArrivals::failed(FetchStatus::HttpStatus(response.status));
    }

    let now = clock.now();
    match parse_response(&response.body, &now) {
        Ok(services) => {
            debug!("Stop {}: {} services", stop_code, services.len());
            return StopArrivals{
                services: services,
                status: FetchStatus::Ok,
            };
        },
        Err(err) => {
            warn!("Couldn't parse response for stop {}: {}", stop_code, err);
            return StopArrivals::failed(FetchStatus::Failed(format!("{}", err)));
        }
    }
}

pub fn real_fetch_fn(url: &str, api_key: &str) -> result::BusDashResult<RawResponse> {
    let client = reqwest::blocking::Client::new();
    let response = client.get(url)
        .header("AccountKey", api_key)
        .header(reqwest::header::ACCEPT, "application/json")
        .header(reqwest::header::USER_AGENT, "busdash")
        .send()?;

    let status = response.status().as_u16();
    let body = response.text()?;
    return Ok(RawResponse{
        status: status,
        body: body,
    });
}

pub fn parse_response(response_body: &str, now: &chrono::DateTime<chrono::Utc>) -> result::BusDashResult<Vec<ServiceArrival>> {
    let response: LtaBusArrivalResponse = serde_json::from_str(response_body)?;

    let mut arrivals = vec![];
    for service in &response.services {
        let mut arrival_minutes = vec![];
        let mut vehicle_types = vec![];

        let slots = [service.next_bus.as_ref(), service.next_bus2.as_ref(), service.next_bus3.as_ref()];
        for next_bus in slots.iter().flatten() {
            let eta = match next_bus.estimated_arrival {
                Some(ref eta) => eta,
                None => continue,
            };

            match chrono::DateTime::parse_from_rfc3339(eta) {
                Ok(eta) => {
                    arrival_minutes.push(minutes_until(&eta, now));
                    vehicle_types.push(next_bus.vehicle_type.clone());
                },
                Err(err) => {
                    warn!("Service {}: skipping bad EstimatedArrival '{}': {}",
                          service.service_no, eta, err);
                },
            }
        }

        if !arrival_minutes.is_empty() {
            arrivals.push(ServiceArrival{
                service_number: service.service_no.clone(),
                arrival_minutes: arrival_minutes,
                vehicle_types: vehicle_types,
            });
        }
    }

    return Ok(arrivals);
}

/// Whole minutes from `now` until `eta`, rounding halves to even. Buses
/// that are already due come out as zero or negative.
pub fn minutes_until(eta: &chrono::DateTime<chrono::FixedOffset>,
                     now: &chrono::DateTime<chrono::Utc>) -> i64 {
    let wait_millis = eta.with_timezone(&chrono::Utc)
        .signed_duration_since(*now)
        .num_milliseconds();

    return (wait_millis as f64 / 60_000.0).round_ties_even() as i64;
}
