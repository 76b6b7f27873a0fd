//! Subnet command handlers.

use tabled::Tabled;

use ipam_core::{
    Command as CoreCommand, CommandResult, CreateSubnetRequest, Ipam, SubnetQuery, SubnetUsage,
    SubnetView,
};

use crate::cli::{FindSubnetArgs, GlobalOpts, SubnetsArgs, SubnetsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct SubnetRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "CIDR")]
    cidr: String,
    #[tabled(rename = "Family")]
    family: String,
    #[tabled(rename = "Usable")]
    usable: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&SubnetView> for SubnetRow {
    fn from(s: &SubnetView) -> Self {
        Self {
            id: s.id.to_string(),
            name: output::or_dash(s.name.as_deref()),
            cidr: s.cidr.clone(),
            family: s.family.to_string(),
            usable: s.usable_host_count.to_string(),
            description: s.description.clone().unwrap_or_default(),
        }
    }
}

fn detail(s: &SubnetView) -> String {
    output::detail_lines(&[
        ("ID", s.id.to_string()),
        ("Name", output::or_dash(s.name.as_deref())),
        ("CIDR", s.cidr.clone()),
        ("Family", s.family.to_string()),
        ("Netmask", s.netmask.clone()),
        ("Broadcast", s.broadcast.clone()),
        ("First usable", s.first_usable.clone()),
        ("Last usable", s.last_usable.clone()),
        ("Hosts", s.host_count.to_string()),
        ("Usable hosts", s.usable_host_count.to_string()),
        ("Description", output::or_dash(s.description.as_deref())),
    ])
}

fn usage_detail(u: &SubnetUsage) -> String {
    output::detail_lines(&[
        ("Subnet", format!("{} ({})", u.cidr, u.subnet_id)),
        ("Usable", u.usable.to_string()),
        ("Assigned", u.assigned.to_string()),
        ("Free", u.free.to_string()),
    ])
}

fn print_list(views: &[SubnetView], global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_list(global.output, views, SubnetRow::from, |s| s.cidr.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn print_single(view: &SubnetView, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(global.output, view, detail, |s| s.id.to_string())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn query_from(args: FindSubnetArgs) -> Result<SubnetQuery, CliError> {
    match (args.cidr, args.name, args.contains) {
        (Some(cidr), None, None) => Ok(SubnetQuery::Cidr(cidr)),
        (None, Some(name), None) => Ok(SubnetQuery::Name(name)),
        (None, None, Some(address)) => Ok(SubnetQuery::Contains(address)),
        _ => Err(CliError::Validation {
            field: "query".into(),
            reason: "give exactly one of --cidr, --name, --contains".into(),
        }),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ipam: &Ipam, args: SubnetsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        SubnetsCommand::List => {
            let views: Vec<SubnetView> = ipam.subnets().await?.iter().map(|s| s.view()).collect();
            print_list(&views, global)
        }

        SubnetsCommand::Get { subnet } => {
            let subnet = util::resolve_subnet(ipam, &subnet).await?;
            print_single(&subnet.view(), global)
        }

        SubnetsCommand::Find(find) => {
            let query = query_from(find)?;
            let views: Vec<SubnetView> = ipam
                .find_subnets(&query)
                .await?
                .iter()
                .map(|s| s.view())
                .collect();
            print_list(&views, global)
        }

        SubnetsCommand::Create {
            cidr,
            name,
            description,
        } => {
            let result = ipam
                .execute(CoreCommand::CreateSubnet(CreateSubnetRequest {
                    cidr,
                    name,
                    description,
                }))
                .await?;
            if let CommandResult::Subnet(subnet) = result {
                output::success(global, &format!("Created subnet {}", subnet.block));
                print_single(&subnet.view(), global)?;
            }
            Ok(())
        }

        SubnetsCommand::Delete { subnet } => {
            let subnet = util::resolve_subnet(ipam, &subnet).await?;
            let usage = ipam.subnet_usage(subnet.id).await?;
            let prompt = format!(
                "Delete subnet {} and its {} assigned address(es)?",
                subnet.block, usage.assigned
            );
            if !util::confirm(&prompt, "subnets delete", global.yes)? {
                return Ok(());
            }
            let released = ipam.delete_subnet(subnet.id).await?;
            output::success(
                global,
                &format!("Deleted subnet {} ({released} address(es) released)", subnet.block),
            );
            Ok(())
        }

        SubnetsCommand::Usage { subnet } => {
            let subnet = util::resolve_subnet(ipam, &subnet).await?;
            let usage = ipam.subnet_usage(subnet.id).await?;
            let out = output::render_single(global.output, &usage, usage_detail, |u| {
                u.free.to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
