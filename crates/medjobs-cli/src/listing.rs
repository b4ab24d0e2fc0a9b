// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use medjobs_api::Client;
use medjobs_app::{FilterSelection, ListController, ResourceKind, items_from_payload};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub kind: ResourceKind,
    pub search: String,
    pub filters: Vec<(String, String)>,
}

/// Fetches one collection and runs it through the same controller the UI
/// uses.
pub fn fetch_listing(client: &Client, request: &ListRequest) -> Result<ListController> {
    let path = request.kind.collection_path();
    let payload = client.get_json(path).with_context(|| {
        format!(
            "fetch {path} from {} -- check [api].base_url or run `medjobs --login <email>`",
            client.base_url()
        )
    })?;

    let mut controller = ListController::for_resource(request.kind);
    controller.set_collection(items_from_payload(&payload));
    controller.set_search(&request.search);
    for (field, value) in &request.filters {
        if !controller.select_filter(field, FilterSelection::value(value.clone())) {
            let available = controller
                .filter_descriptors()
                .iter()
                .map(|descriptor| descriptor.field.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            bail!(
                "{} has no filter {field:?}; available filters: {available}",
                request.kind.as_str()
            );
        }
    }
    Ok(controller)
}

/// Tab-separated id plus declared columns, one line per visible row.
pub fn render_listing(controller: &ListController) -> String {
    let mut out = String::from("id");
    for column in controller.columns() {
        out.push('\t');
        out.push_str(&column.title);
    }
    out.push('\n');

    for item in controller.visible() {
        out.push_str(&item.text("id"));
        for column in controller.columns() {
            out.push('\t');
            out.push_str(&item.text(&column.field).replace(['\t', '\n'], " "));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::render_listing;
    use medjobs_app::{CollectionItem, FilterSelection, ListController, ResourceKind};
    use serde_json::json;

    #[test]
    fn renders_header_and_visible_rows() {
        let mut controller = ListController::for_resource(ResourceKind::Plans);
        controller.set_collection(
            [
                json!({"id": 1, "name": "Basic", "price": 499, "duration": "monthly", "status": "active"}),
                json!({"id": 2, "name": "Pro\tPlus", "price": 998, "duration": "yearly", "status": "available"}),
            ]
            .into_iter()
            .filter_map(CollectionItem::from_value)
            .collect(),
        );

        let all = render_listing(&controller);
        assert_eq!(
            all,
            "id\tPlan\tPrice\tDuration\tStatus\n1\tBasic\t499\tmonthly\tactive\n2\tPro Plus\t998\tyearly\tavailable\n"
        );

        controller.select_filter("status", FilterSelection::value("active"));
        assert_eq!(render_listing(&controller).lines().count(), 2);
    }
}
