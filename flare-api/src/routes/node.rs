//! Node routes: `/nodes`
//!
//! Connection counters are plain fields. Callers bump them with
//! `PATCH /nodes/{id}`; nothing here derives them from sockets.

crate::entity_routes! {
    entity: Node,
    field: nodes,
    tag: "Nodes",
    base: "/nodes",
    count: "/nodes/count",
    by_id: "/nodes/{id}",
}
