use crate::prelude::*;

use serde_json::Value;

use crate::utils::display_value;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Column {
    pub field: &'static str,
    pub label: &'static str,
}
impl Column {
    pub const fn new(field: &'static str, label: &'static str) -> Self {
        Self { field, label }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Row {
    key: String,
    cells: Vec<String>,
}

/// Projects `items` on `columns`, keying each row by its `row_key` field
fn table_rows(items: &[Value], columns: &[Column], row_key: &str) -> Vec<Row> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| Row {
            key: item
                .get(row_key)
                .map(|key| display_value(Some(key)))
                .unwrap_or_else(|| index.to_string()),
            cells: columns
                .iter()
                .map(|column| display_value(item.get(column.field)))
                .collect(),
        })
        .collect()
}

/// Table of loaded entities with a loading indicator and a refresh button
#[component]
pub fn DataTable(
    items: Vec<Value>,
    loading: bool,
    columns: &'static [Column],
    row_key: &'static str,
    onrefresh: EventHandler<()>,
) -> Element {
    log::debug!("DataTable Rendered");

    let rows = table_rows(&items, columns, row_key);

    rsx! {
        div { class: "flex justify-end gap-2 mb-2",
            if loading {
                span { class: "loading loading-spinner loading-sm" }
            }
            button {
                class: "btn btn-sm btn-outline btn-primary",
                disabled: loading,
                onclick: move |_| onrefresh.call(()),
                "Refresh"
            }
        }
        table { class: "table table-zebra w-full",
            thead {
                tr {
                    for column in columns.iter() {
                        th { key: "{column.field}", "{column.label}" }
                    }
                }
            }
            tbody {
                for row in rows {
                    tr { key: "{row.key}",
                        for (index , cell) in row.cells.into_iter().enumerate() {
                            td { key: "{index}", "{cell}" }
                        }
                    }
                }
                if items.is_empty() && !loading {
                    tr {
                        td { class: "text-center italic", colspan: "{columns.len()}", "No items" }
                    }
                }
            }
        }
    }
}
