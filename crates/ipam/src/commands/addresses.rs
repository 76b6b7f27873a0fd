//! Address command handlers.

use tabled::Tabled;

use ipam_core::{
    AddressId, AddressQuery, AddressView, Command as CoreCommand, CommandResult,
    CreateAddressRequest, Ipam, Patch, UpdateAddressRequest,
};

use crate::cli::{AddressListArgs, AddressesArgs, AddressesCommand, AssignmentArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct AddressRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Subnet")]
    subnet: String,
    #[tabled(rename = "DNS Name")]
    dns_name: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&AddressView> for AddressRow {
    fn from(a: &AddressView) -> Self {
        Self {
            id: a.id.to_string(),
            address: a.address.clone(),
            subnet: a.subnet_id.to_string(),
            dns_name: output::or_dash(a.dns_name.as_deref()),
            description: a.description.clone().unwrap_or_default(),
        }
    }
}

fn detail(a: &AddressView) -> String {
    output::detail_lines(&[
        ("ID", a.id.to_string()),
        ("Address", a.address.clone()),
        ("Family", a.family.to_string()),
        ("Key", a.address_key.to_storage_key()),
        ("Subnet", a.subnet_id.to_string()),
        ("DNS name", output::or_dash(a.dns_name.as_deref())),
        ("Description", output::or_dash(a.description.as_deref())),
    ])
}

fn print_single(view: &AddressView, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(global.output, view, detail, |a| a.address.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

async fn create(
    ipam: &Ipam,
    subnet: &str,
    address: Option<String>,
    assignment: AssignmentArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let subnet = util::resolve_subnet(ipam, subnet).await?;
    let result = ipam
        .execute(CoreCommand::CreateAddress(CreateAddressRequest {
            subnet_id: subnet.id,
            address,
            dns_name: assignment.dns_name,
            description: assignment.description,
        }))
        .await?;
    if let CommandResult::Address(record) = result {
        output::success(
            global,
            &format!("Assigned {} in {}", record.address, subnet.block),
        );
        print_single(&record.view(), global)?;
    }
    Ok(())
}

async fn list(ipam: &Ipam, args: AddressListArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let subnet_id = match args.subnet {
        Some(ref reference) => Some(util::resolve_subnet(ipam, reference).await?.id),
        None => None,
    };
    let query = AddressQuery {
        subnet_id,
        address: args.address,
        dns_name: args.dns_name,
        limit: Some(args.limit),
        offset: args.offset,
    };
    let views: Vec<AddressView> = ipam
        .addresses(&query)
        .await?
        .iter()
        .map(|a| a.view())
        .collect();
    let out = output::render_list(
        global.output,
        &views,
        AddressRow::from,
        |a| a.address.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    ipam: &Ipam,
    args: AddressesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        AddressesCommand::List(list_args) => list(ipam, list_args, global).await,

        AddressesCommand::Get { id } => {
            let record = ipam.address(AddressId::new(id)).await?;
            print_single(&record.view(), global)
        }

        AddressesCommand::Allocate { subnet, assignment } => {
            create(ipam, &subnet, None, assignment, global).await
        }

        AddressesCommand::Register {
            subnet,
            address,
            assignment,
        } => create(ipam, &subnet, Some(address), assignment, global).await,

        AddressesCommand::Update {
            id,
            dns_name,
            clear_dns_name,
            description,
            clear_description,
        } => {
            let update = UpdateAddressRequest {
                dns_name: Patch::from_parts(dns_name, clear_dns_name),
                description: Patch::from_parts(description, clear_description),
            };
            let result = ipam
                .execute(CoreCommand::UpdateAddress {
                    id: AddressId::new(id),
                    update,
                })
                .await?;
            if let CommandResult::Address(record) = result {
                output::success(global, &format!("Updated {}", record.address));
                print_single(&record.view(), global)?;
            }
            Ok(())
        }

        AddressesCommand::Delete { id } => {
            let id = AddressId::new(id);
            let record = ipam.address(id).await?;
            let prompt = format!("Release {}?", record.address);
            if !util::confirm(&prompt, "addresses delete", global.yes)? {
                return Ok(());
            }
            ipam.execute(CoreCommand::DeleteAddress { id }).await?;
            output::success(global, &format!("Released {}", record.address));
            Ok(())
        }
    }
}
