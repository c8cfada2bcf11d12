/// Upcoming buses for one service at one stop, as of the last refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceArrival {
    pub service_number: String,
    // At most three entries; vehicle_types[i] belongs to arrival_minutes[i].
    pub arrival_minutes: Vec<i64>,
    pub vehicle_types: Vec<String>,
}

/// Why a stop has (or doesn't have) data. Lets the board tell "the API
/// is down" apart from "no buses right now".
#[derive(Debug, Clone, PartialEq)]
pub enum FetchStatus {
    Ok,
    HttpStatus(u16),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StopArrivals {
    pub services: Vec<ServiceArrival>,
    pub status: FetchStatus,
}

impl StopArrivals {
    pub fn empty() -> StopArrivals {
        return StopArrivals{
            services: vec![],
            status: FetchStatus::Ok,
        };
    }

    pub fn failed(status: FetchStatus) -> StopArrivals {
        return StopArrivals{
            services: vec![],
            status: status,
        };
    }
}

#[derive(Debug, Clone)]
pub struct Section {
    pub name: String,
    pub stop_code: String,
    pub arrivals: StopArrivals,
}

#[derive(Debug, Clone)]
pub struct Board {
    pub sections: Vec<Section>,
}

impl Board {
    pub fn empty(stops: &[crate::config::StopConfig]) -> Board {
        return Board{
            sections: stops.iter().map(|stop| Section{
                name: stop.name.clone(),
                stop_code: stop.code.clone(),
                arrivals: StopArrivals::empty(),
            }).collect(),
        };
    }
}
