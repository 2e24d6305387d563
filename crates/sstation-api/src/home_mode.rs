// Home mode endpoints
//
// Appliance-wide home/away state: `SYNO.SurveillanceStation.HomeMode`.

use tracing::{debug, info};

use crate::auth::ApiName;
use crate::client::SurveillanceClient;
use crate::error::Error;
use crate::models::HomeModeInfo;

impl SurveillanceClient {
    /// Whether home mode is currently on.
    ///
    /// `SYNO.SurveillanceStation.HomeMode` `GetInfo` -> `data.on`
    pub async fn home_mode(&self) -> Result<bool, Error> {
        debug!("fetching home mode");
        let info: HomeModeInfo = self.call(ApiName::HomeMode, "GetInfo", &[]).await?;
        Ok(info.on)
    }

    /// Switch home mode and return the mode the appliance reports afterwards.
    ///
    /// `Switch` with `on=true|false`, followed by a `GetInfo` read-back.
    /// Whether the returned value matches the request is the caller's call.
    pub async fn set_home_mode(&self, home: bool) -> Result<bool, Error> {
        debug!(home, "switching home mode");
        self.call_unit(ApiName::HomeMode, "Switch", &[("on", home.to_string())])
            .await?;
        let applied = self.home_mode().await?;
        info!(requested = home, applied, "home mode switched");
        Ok(applied)
    }
}
