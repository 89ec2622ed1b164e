use crate::prelude::*;

use crate::{utils::CCStr, Route};

#[component]
pub fn SshKeyCreateView() -> Element {
    log::debug!("SshKeyCreateView Rendered");

    use_drop(|| log::debug!("SshKeyCreateView Dropped"));

    rsx! {
        super::TitledView {
            title: CCStr::from("Add SSH Key"),
            subtitle: CCStr::from("Import an OpenSSH public key as a new keypair."),
            right: rsx! {
                Link { class: "btn btn-outline btn-primary", to: Route::SshKeyListView {}, "Back" }
            },
            SshKeyCreateForm {}
        }
    }
}

#[component]
fn SshKeyCreateForm() -> Element {
    log::debug!("SshKeyCreateForm Rendered");

    let context = state_management::use_loader_context();
    let api = state_management::use_infrastructure_api();

    let mut name = use_signal(String::new);
    let mut public_key = use_signal(String::new);
    let mut creating = use_signal(|| false);

    let submit = move |_| {
        let (name, public_key) = (name.peek().clone(), public_key.peek().clone());
        if name.trim().is_empty() || public_key.trim().is_empty() {
            alert_warn("Both the name and the public key are required");
            return;
        }
        let context = context.clone();
        let api = api.clone();
        creating.set(true);
        spawn(async move {
            match state_management::create_ssh_key(&context, &api, &name, &public_key).await {
                Ok(_) => {
                    alert_success(format!("SSH key {} added", name.trim()));
                    navigator().push(Route::SshKeyListView {});
                }
                Err(e) => {
                    log::error!("Could not add SSH key {name}: {e}");
                    alert_error(format!("Could not add SSH key: {e}"));
                }
            }
            creating.set(false);
        });
    };

    use_drop(|| log::debug!("SshKeyCreateForm Dropped"));

    rsx! {
        div { class: "max-w-2xl flex flex-col gap-4",
            fieldset { class: "fieldset",
                legend { class: "fieldset-legend", "Name" }
                input {
                    r#type: "text",
                    class: "input w-full",
                    value: "{name}",
                    placeholder: "Enter a unique name...",
                    disabled: creating(),
                    oninput: move |event| name.set(event.value()),
                }
            }
            fieldset { class: "fieldset",
                legend { class: "fieldset-legend", "Public key" }
                textarea {
                    class: "textarea w-full h-32 font-mono",
                    value: "{public_key}",
                    placeholder: "ssh-ed25519 AAAA...",
                    disabled: creating(),
                    oninput: move |event| public_key.set(event.value()),
                }
            }
            button {
                class: "btn btn-primary self-end",
                disabled: creating(),
                onclick: submit,
                if creating() {
                    span { class: "loading loading-spinner loading-sm" }
                }
                "Add SSH key"
            }
        }
    }
}
