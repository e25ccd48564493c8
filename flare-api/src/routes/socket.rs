//! Socket routes: `/sockets`

crate::entity_routes! {
    entity: Socket,
    field: sockets,
    tag: "Sockets",
    base: "/sockets",
    count: "/sockets/count",
    by_id: "/sockets/{id}",
}
