//! DNS zone command handlers.

use tabled::Tabled;

use ipam_core::{
    Command as CoreCommand, CommandResult, CreateZoneRequest, DnsZone, Ipam, SoaRequest,
    UpdateZoneRequest, ZoneId,
};

use crate::cli::{GlobalOpts, SoaTimerArgs, ZonesArgs, ZonesCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ZoneRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Primary NS")]
    mname: String,
    #[tabled(rename = "Contact")]
    rname: String,
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&DnsZone> for ZoneRow {
    fn from(z: &DnsZone) -> Self {
        Self {
            id: z.id.to_string(),
            name: z.name.clone(),
            mname: z.soa.mname.clone(),
            rname: z.soa.rname.clone(),
            serial: z.soa.serial.to_string(),
            description: z.description.clone().unwrap_or_default(),
        }
    }
}

fn detail(z: &DnsZone) -> String {
    output::detail_lines(&[
        ("ID", z.id.to_string()),
        ("Name", z.name.clone()),
        ("Description", output::or_dash(z.description.as_deref())),
        ("Primary NS", z.soa.mname.clone()),
        ("Contact", z.soa.rname.clone()),
        ("Serial", z.soa.serial.to_string()),
        ("Refresh", z.soa.refresh.to_string()),
        ("Retry", z.soa.retry.to_string()),
        ("Expire", z.soa.expire.to_string()),
        ("Minimum", z.soa.minimum.to_string()),
    ])
}

fn print_single(zone: &DnsZone, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(global.output, zone, detail, |z| z.id.to_string())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

impl SoaTimerArgs {
    fn is_empty(&self) -> bool {
        self.serial.is_none()
            && self.refresh.is_none()
            && self.retry.is_none()
            && self.expire.is_none()
            && self.minimum.is_none()
    }

    /// Overwrite the timers that were given on the command line.
    fn apply(self, soa: &mut SoaRequest) {
        if let Some(v) = self.serial {
            soa.serial = v;
        }
        if let Some(v) = self.refresh {
            soa.refresh = v;
        }
        if let Some(v) = self.retry {
            soa.retry = v;
        }
        if let Some(v) = self.expire {
            soa.expire = v;
        }
        if let Some(v) = self.minimum {
            soa.minimum = v;
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ipam: &Ipam, args: ZonesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ZonesCommand::List => {
            let zones = ipam.zones().await?;
            let out = output::render_list(
                global.output,
                &zones,
                ZoneRow::from,
                |z| z.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ZonesCommand::Get { id } => {
            let zone = ipam.zone(ZoneId::new(id)).await?;
            print_single(&zone, global)
        }

        ZonesCommand::Create {
            name,
            mname,
            rname,
            timers,
            description,
        } => {
            let mut soa = SoaRequest::new(mname, rname);
            timers.apply(&mut soa);
            let result = ipam
                .execute(CoreCommand::CreateZone(CreateZoneRequest {
                    name,
                    description,
                    soa,
                }))
                .await?;
            if let CommandResult::Zone(zone) = result {
                output::success(global, &format!("Created zone {}", zone.name));
                print_single(&zone, global)?;
            }
            Ok(())
        }

        ZonesCommand::Update {
            id,
            name,
            description,
            mname,
            rname,
            timers,
        } => {
            let id = ZoneId::new(id);
            let soa = if mname.is_none() && rname.is_none() && timers.is_empty() {
                None
            } else {
                // SOA is replaced whole, so start from the stored one.
                let mut soa = SoaRequest::from(ipam.zone(id).await?.soa);
                if let Some(mname) = mname {
                    soa.mname = mname;
                }
                if let Some(rname) = rname {
                    soa.rname = rname;
                }
                timers.apply(&mut soa);
                Some(soa)
            };
            let result = ipam
                .execute(CoreCommand::UpdateZone {
                    id,
                    update: UpdateZoneRequest {
                        name,
                        description,
                        soa,
                    },
                })
                .await?;
            if let CommandResult::Zone(zone) = result {
                output::success(global, &format!("Updated zone {}", zone.name));
                print_single(&zone, global)?;
            }
            Ok(())
        }

        ZonesCommand::Delete { id } => {
            let id = ZoneId::new(id);
            let zone = ipam.zone(id).await?;
            let prompt = format!("Delete zone {}?", zone.name);
            if !util::confirm(&prompt, "zones delete", global.yes)? {
                return Ok(());
            }
            ipam.execute(CoreCommand::DeleteZone { id }).await?;
            output::success(global, &format!("Deleted zone {}", zone.name));
            output::hint(
                global,
                "Existing DNS names under this zone are kept; new names must match another zone.",
            );
            Ok(())
        }
    }
}
