use clap::ArgMatches;
use tracing::{debug, trace};

use crate::{
    collection::{CollectionError, Filters, ValueSpec},
    commands::params::{PARAMETER_FRAMEWORK, PARAMETER_SITE},
    context::ExecutionContext,
    error::CliError,
    format::{Formattable, MemberList, Records},
    model::Model,
    param_utils::get_format_parameter_value,
    resources::Site,
};

const SITE_LIST_FIELDS: [&str; 2] = ["name", "framework"];

/// Sites of the current user keyed by id, optionally only one framework
pub fn site_list(context: &ExecutionContext, framework: Option<&str>) -> Result<MemberList, CliError> {
    let mut sites = context.sites()?;

    let mut filters = Filters::new();
    if let Some(framework) = framework {
        filters = filters.with(PARAMETER_FRAMEWORK, framework);
    }

    let members = sites.get_filtered_member_list(
        &filters,
        "id",
        &ValueSpec::fields(SITE_LIST_FIELDS),
    )?;
    debug!("Listing {} site(s)", members.len());
    Ok(MemberList::new("id", members))
}

pub fn list_sites(context: &ExecutionContext, sub_matches: &ArgMatches) -> Result<(), CliError> {
    let format = get_format_parameter_value(sub_matches)?;
    let framework = sub_matches.get_one::<String>(PARAMETER_FRAMEWORK);
    let sites = site_list(context, framework.map(String::as_str))?;
    println!("{}", sites.format(&format)?);
    Ok(())
}

/// Finds a site of the current user by id, then by name.
pub fn resolve_site_id(context: &ExecutionContext, site: &str) -> Result<String, CliError> {
    let mut sites = context.sites()?;

    if sites.ids()?.iter().any(|id| id == site) {
        return Ok(site.to_string());
    }

    trace!("{:?} is not a site id, trying names", site);
    let ids_by_name = sites.listing("name", &ValueSpec::field("id"))?;
    match ids_by_name.get(site).and_then(|id| id.as_str()) {
        Some(id) => Ok(id.to_string()),
        None => Err(CollectionError::NotFound {
            kind: Site::KIND,
            id: site.to_string(),
        }
        .into()),
    }
}

/// Serialized environments of a site
pub fn environment_records(context: &ExecutionContext, site: &str) -> Result<Records, CliError> {
    let site_id = resolve_site_id(context, site)?;
    let mut environments = context.environments(&site_id);
    let records = environments
        .all()?
        .into_iter()
        .map(|environment| environment.serialize())
        .collect();
    Ok(Records(records))
}

pub fn list_environments(context: &ExecutionContext, sub_matches: &ArgMatches) -> Result<(), CliError> {
    let format = get_format_parameter_value(sub_matches)?;
    let site = sub_matches
        .get_one::<String>(PARAMETER_SITE)
        .ok_or_else(|| CliError::MissingRequiredArgument(PARAMETER_SITE.to_string()))?;
    let environments = environment_records(context, site)?;
    println!("{}", environments.format(&format)?);
    Ok(())
}
