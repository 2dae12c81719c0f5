#[cfg(test)]
mod tests {
    use replica_etl::libs::error::EtlError;

    /// Only source/target unavailability is retried with backoff; every
    /// other kind surfaces to the caller immediately, per the propagation
    /// policy each component follows.
    #[test]
    fn only_source_and_target_unavailable_are_transient() {
        assert!(EtlError::SourceUnavailable(anyhow::anyhow!("reset")).is_transient());
        assert!(EtlError::TargetUnavailable(anyhow::anyhow!("reset")).is_transient());

        assert!(!EtlError::Configuration("missing var".into()).is_transient());
        assert!(!EtlError::UnknownTable("GHOST".into()).is_transient());
        assert!(!EtlError::WorkUnitBusy { table: "APP_4_SALES".into(), window: "2024-01-15..2024-01-16".into() }.is_transient());
        assert!(!EtlError::Cancelled.is_transient());
        assert!(!EtlError::SourceIntegrity { table: "APP_4_SALES".into(), detail: "duplicate key".into() }.is_transient());
    }
}
