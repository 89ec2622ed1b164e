use crate::prelude::*;

use crate::{
    components::data_table::{Column, DataTable},
    context_loader::Params,
    utils::CCStr,
};

pub mod clusters;
pub mod inventory;
pub mod main_layout;
pub mod ssh_key_create;
pub mod storage;

#[component]
fn TitledView(title: CCStr, subtitle: CCStr, right: Option<Element>, children: Element) -> Element {
    rsx! {
        div { class: "flex justify-between gap-4",
            div { class: "shrink-0",
                h1 { class: "text-4xl font-black", {title} }
                h2 { class: "text-base font-light", {subtitle} }
            }
            div { class: "flex justify-end", {right} }
        }
        div { class: "mb-4 h-px border-t border-solid border-gray-500" }
        {children}
    }
}

/// Table bound to the loader registered under `loader_key`
#[component]
fn LoaderTable(
    loader_key: &'static str,
    params: Params,
    columns: &'static [Column],
    row_key: &'static str,
    refetch_on_mount: bool,
) -> Element {
    log::debug!("LoaderTable({loader_key}) Rendered");

    let handle = helper_hooks::use_data_loader(loader_key, params, refetch_on_mount);

    use_drop(move || log::debug!("LoaderTable({loader_key}) Dropped"));

    rsx! {
        DataTable {
            items: handle.data(),
            loading: handle.loading(),
            columns,
            row_key,
            onrefresh: move |_| handle.reload(true),
        }
    }
}
