//! Client-visible navigation routes

use std::fmt;

/// Tab inside the elevator detail view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DetailTab {
    #[default]
    Basic,
    Sensor,
}

impl DetailTab {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailTab::Basic => "basic",
            DetailTab::Sensor => "sensor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    ElevatorList,
    /// `index` is the list position, not the elevator id
    ElevatorDetail { index: usize, tab: DetailTab },
    SignIn,
    SignOut,
}

impl Route {
    /// Parse a path. Query strings and trailing slashes are ignored; a
    /// detail path without a tab resolves to the basic tab.
    pub fn parse(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Some(Route::Home),
            ["ElevatorInfo"] => Some(Route::ElevatorList),
            ["ElevatorInfo", "detail", index] => Some(Route::ElevatorDetail {
                index: index.parse().ok()?,
                tab: DetailTab::Basic,
            }),
            ["ElevatorInfo", "detail", index, tab] => {
                let tab = match *tab {
                    "basic" => DetailTab::Basic,
                    "sensor" => DetailTab::Sensor,
                    _ => return None,
                };
                Some(Route::ElevatorDetail {
                    index: index.parse().ok()?,
                    tab,
                })
            }
            ["SignIn"] => Some(Route::SignIn),
            ["SignOut"] => Some(Route::SignOut),
            _ => None,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::ElevatorList => "/ElevatorInfo".to_string(),
            Route::ElevatorDetail { index, tab } => {
                format!("/ElevatorInfo/detail/{}/{}", index, tab.as_str())
            }
            Route::SignIn => "/SignIn".to_string(),
            Route::SignOut => "/SignOut".to_string(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
