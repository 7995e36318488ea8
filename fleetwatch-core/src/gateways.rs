//! Bundle of the source gateways a store provides.

use std::sync::Arc;

use crate::ports::{
    ChecklistDefinitionGateway, ChecklistGateway, FineGateway, IncidentGateway,
    MaintenanceGateway, UsageLogGateway, UserGateway,
};

/// One implementation per record collection.
///
/// Stores usually implement every trait on a single type; [`Gateways::from_store`]
/// shares that value across all slots.
#[derive(Clone)]
pub struct Gateways {
    /// User accounts.
    pub users: Arc<dyn UserGateway>,
    /// Vehicle usage logs.
    pub usage_logs: Arc<dyn UsageLogGateway>,
    /// Incidents.
    pub incidents: Arc<dyn IncidentGateway>,
    /// Checklists.
    pub checklists: Arc<dyn ChecklistGateway>,
    /// Fines.
    pub fines: Arc<dyn FineGateway>,
    /// Maintenance orders.
    pub maintenances: Arc<dyn MaintenanceGateway>,
    /// Checklist item configuration.
    pub checklist_definitions: Arc<dyn ChecklistDefinitionGateway>,
}

impl Gateways {
    /// Use one store value for every collection.
    #[must_use]
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserGateway
            + UsageLogGateway
            + IncidentGateway
            + ChecklistGateway
            + FineGateway
            + MaintenanceGateway
            + ChecklistDefinitionGateway
            + 'static,
    {
        Self {
            users: Arc::<S>::clone(&store),
            usage_logs: Arc::<S>::clone(&store),
            incidents: Arc::<S>::clone(&store),
            checklists: Arc::<S>::clone(&store),
            fines: Arc::<S>::clone(&store),
            maintenances: Arc::<S>::clone(&store),
            checklist_definitions: store,
        }
    }
}
