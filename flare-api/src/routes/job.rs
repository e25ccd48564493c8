//! Job routes: `/jobs`

crate::entity_routes! {
    entity: Job,
    field: jobs,
    tag: "Jobs",
    base: "/jobs",
    count: "/jobs/count",
    by_id: "/jobs/{id}",
}
