//! On-demand operations invoked by an administrator through the
//! orchestrator's action surface. Unlike event handlers, an action that
//! finds nothing to act on reports a named failure instead of waiting.

use crate::certs::{self, CertificateIssuer, CertificateMaterial};
use crate::cluster::{LeadershipProbe, PeerStore};
use crate::driver::{ConfigSink, Event, ReconciliationDriver, ServiceSupervisor};
use crate::error::{Error, Result};
use crate::readiness::UnitStatus;
use crate::topology::OptionalService;

impl<P, L, I, S, V> ReconciliationDriver<P, L, I, S, V>
where
    P: PeerStore,
    L: LeadershipProbe,
    I: CertificateIssuer,
    S: ConfigSink,
    V: ServiceSupervisor,
{
    /// Stop the managed processes and hold off topology commits until
    /// resumed.
    pub fn pause(&mut self) -> Result<()> {
        let mut state = self.state_store.load()?;
        self.supervisor
            .pause()
            .map_err(|err| Error::collaborator("pause-services", err.to_string()))?;
        state.paused = true;
        self.state_store.save(&mut state)?;
        crate::unit_event!(info, "quartermaster::actions", "unit_paused", unit = self.unit);
        Ok(())
    }

    /// Restart the managed processes and run a convergence pass to catch up
    /// on anything that changed while paused.
    pub fn resume(&mut self) -> Result<UnitStatus> {
        let mut state = self.state_store.load()?;
        self.supervisor
            .resume()
            .map_err(|err| Error::collaborator("resume-services", err.to_string()))?;
        state.paused = false;
        self.state_store.save(&mut state)?;
        crate::unit_event!(info, "quartermaster::actions", "unit_resumed", unit = self.unit);
        self.handle(Event::Tick)
    }

    /// Return the granted certificate material for the current identity.
    /// Absence is a hard failure here, never silently empty.
    pub fn get_certificates(&self) -> Result<CertificateMaterial> {
        let attributes = certs::attributes_for(&self.config, self.local_ip)?;
        certs::retrieve_material(&self.issuer, &attributes)
    }

    /// Toggle an optional service and re-trigger topology regeneration.
    pub fn set_service_enabled(
        &mut self,
        service: OptionalService,
        enabled: bool,
    ) -> Result<UnitStatus> {
        let mut state = self.state_store.load()?;
        match service {
            OptionalService::HostagentMessenger => state.hostagent_messenger = enabled,
            OptionalService::UbuntuInstallerAttach => state.ubuntu_installer_attach = enabled,
        }
        self.state_store.save(&mut state)?;
        crate::unit_event!(
            info,
            "quartermaster::actions",
            "service_toggled",
            unit = self.unit,
            service = service.as_str(),
            enabled = enabled,
        );
        self.handle(Event::Tick)
    }
}
