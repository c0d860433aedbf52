//! Search string and filter parsing for the query endpoints
//!
//! Parameters arrive as a flat string map (path `id` merged with the query
//! string). Flags such as `noIDSearch` count as set when their key is
//! present, whatever the value.

use crate::error::{ApiError, ApiResult};
use gdlo_common::db::{Direction, IdFilter, LevelOrder, LevelQuery};
use gdlo_common::models::official::index_to_storage_id;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::str::FromStr;

pub type Params = HashMap<String, String>;

pub const DEFAULT_COUNT: i64 = 10;

const LEVEL_NAME_LEN: std::ops::RangeInclusive<usize> = 1..=20;
const PLAYER_NAME_LEN: std::ops::RangeInclusive<usize> = 3..=15;

const STAR_ALIASES: &[(&str, &[u8])] = &[
    ("auto", &[1]),
    ("easy", &[2]),
    ("normal", &[3]),
    ("hard", &[4, 5]),
    ("harder", &[6, 7]),
    ("insane", &[8, 9]),
    ("demon", &[10]),
];

const DEMON_ALIASES: &[(&str, &[u8])] = &[
    ("easy", &[1]),
    ("medium", &[2]),
    ("hard", &[3]),
    ("insane", &[4]),
    ("extreme", &[5]),
];

const COIN_TYPE_ALIASES: &[(&str, &[u8])] = &[("bronze", &[0]), ("silver", &[1])];

const LENGTH_ALIASES: &[(&str, &[u8])] = &[
    ("Tiny", &[0]),
    ("Short", &[1]),
    ("Medium", &[2]),
    ("Long", &[3]),
    ("XL", &[4]),
];

/// How the `id` search string selects levels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelSearch {
    All,
    /// Deduplicated, in request order
    IdList(Vec<i64>),
    IdRange { from: Option<i64>, to: Option<i64> },
    NamePrefix(String),
}

impl LevelSearch {
    pub fn parse(id: &str, no_id_search: bool) -> ApiResult<Self> {
        if id.is_empty() {
            return Ok(LevelSearch::All);
        }

        if !no_id_search {
            if let Some(ids) = int_list(id, false)? {
                return Ok(LevelSearch::IdList(dedup(ids)));
            }
            if let Some((from, to)) = id_range(id)? {
                if let (Some(from), Some(to)) = (from, to) {
                    if from > to {
                        return Err(ApiError::BadRequest(
                            "Invalid ID range: lower boundary is greater than the upper."
                                .to_string(),
                        ));
                    }
                }
                return Ok(LevelSearch::IdRange { from, to });
            }
        }

        if is_level_name(id) {
            return Ok(LevelSearch::NamePrefix(id.to_string()));
        }

        Err(ApiError::BadRequest(
            "Wrong search string. Acceptable formats: list/range of level IDs or a valid level name."
                .to_string(),
        ))
    }
}

/// Parsed `/api/level` request
#[derive(Debug, Clone)]
pub struct LevelRequest {
    pub search: LevelSearch,
    pub less_verbose: bool,
    pub page: i64,
    /// Results follow the order of the requested id list
    pub listed_order: bool,
    pub query: LevelQuery,
}

impl LevelRequest {
    pub fn from_params(params: &Params) -> ApiResult<Self> {
        let id = params.get("id").map(String::as_str).unwrap_or("");
        let search = LevelSearch::parse(id, params.contains_key("noIDSearch"))?;

        let mut page = params
            .get("page")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(0)
            .max(0);
        let count = match params.get("count").and_then(|v| v.trim().parse::<i64>().ok()) {
            None | Some(0) => DEFAULT_COUNT,
            Some(count) if count < 1 => {
                return Err(ApiError::BadRequest("Count must be at least 1.".to_string()))
            }
            Some(count) => count,
        };

        let explicit_order = params.get("order").and_then(|v| parse_order(v));
        let direction = match params.get("orderDirection").map(|v| v.to_uppercase()) {
            Some(v) if v == "ASC" => Direction::Asc,
            _ => Direction::Desc,
        };

        let mut query = filters(params)?;
        let mut listed_order = false;

        match &search {
            LevelSearch::All => {}
            LevelSearch::IdList(ids) => {
                page = 0;
                query.ids = IdFilter::List(ids.clone());
                listed_order = explicit_order.is_none();
            }
            LevelSearch::IdRange { from, to } => {
                query.ids = IdFilter::Range {
                    from: *from,
                    to: *to,
                };
            }
            LevelSearch::NamePrefix(prefix) => query.ids = IdFilter::NamePrefix(prefix.clone()),
        }

        if !listed_order {
            let order = explicit_order.unwrap_or(match search {
                LevelSearch::IdRange { .. } => LevelOrder::Id,
                _ => LevelOrder::Likes,
            });
            query = query.order_by(order, direction);
        }

        if !matches!(search, LevelSearch::IdList(_)) {
            let offset = page
                .checked_mul(count)
                .ok_or_else(|| ApiError::BadRequest("Page is out of range.".to_string()))?;
            query = query.limit(count).offset(offset);
        }

        Ok(Self {
            search,
            less_verbose: params.contains_key("lessVerbose"),
            page,
            listed_order,
            query,
        })
    }
}

/// Attribute filters shared by every level search type
fn filters(params: &Params) -> ApiResult<LevelQuery> {
    let value = |key: &str| params.get(key).map(String::as_str).filter(|v| !v.is_empty());
    let mut query = LevelQuery::default();

    if let Some(v) = value("difficulty") {
        query.stars = range_list(v, STAR_ALIASES)?;
    }
    if let Some(v) = value("demonDifficulty") {
        query.demon_tiers = std::iter::once(0).chain(range_list(v, DEMON_ALIASES)?).collect();
    }
    if params.contains_key("coins") {
        query.coins = match value("coins") {
            Some(v) => number_list(v)?,
            None => vec![1, 2, 3],
        };
    }
    if let Some(v) = value("coinsType") {
        query.coins_verified = range_list(v, COIN_TYPE_ALIASES)?
            .into_iter()
            .map(|t| match t {
                0 => Ok(false),
                1 => Ok(true),
                other => Err(invalid_value(&other.to_string())),
            })
            .collect::<ApiResult<_>>()?;
    }
    if let Some(v) = value("cp") {
        query.cp = number_list(v)?;
    }
    if let Some(v) = value("length") {
        query.length = range_list(v, LENGTH_ALIASES)?;
    }
    if params.contains_key("twoPlayer") {
        query.two_player = Some(true);
    }
    if let Some(v) = value("author") {
        query.authors = number_list(v)?;
    }
    if let Some(v) = value("song") {
        let ids: Vec<i64> = number_list(v)?;
        query.songs = if params.contains_key("officialSong") {
            ids.into_iter()
                .map(|index| {
                    u32::try_from(index)
                        .map(index_to_storage_id)
                        .map_err(|_| invalid_value(&index.to_string()))
                })
                .collect::<ApiResult<_>>()?
        } else {
            ids
        };
    }

    Ok(query)
}

fn parse_order(value: &str) -> Option<LevelOrder> {
    match value {
        "id" => Some(LevelOrder::Id),
        "downloads" => Some(LevelOrder::Downloads),
        "likes" => Some(LevelOrder::Likes),
        _ => None,
    }
}

/// `/api/player` search: ids or case-insensitive names
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerSearch {
    Ids(Vec<i64>),
    /// Lowercased, deduplicated
    Names(Vec<String>),
}

impl PlayerSearch {
    pub fn parse(id: &str, no_id_search: bool) -> ApiResult<Self> {
        if !no_id_search {
            if let Some(ids) = int_list(id, false)? {
                return Ok(PlayerSearch::Ids(dedup(ids)));
            }
        }

        let names: Vec<&str> = id.split(',').collect();
        if names.iter().all(|name| is_player_name(name)) {
            return Ok(PlayerSearch::Names(dedup(
                names.into_iter().map(str::to_lowercase).collect(),
            )));
        }

        Err(ApiError::BadRequest(
            "Wrong search string. Acceptable formats: list of player IDs or list of valid player names."
                .to_string(),
        ))
    }
}

/// `/api/song` ids mapped to storage ids: `-n` addresses official index `n`
pub fn song_storage_ids(id: &str) -> ApiResult<Vec<i64>> {
    let ids = int_list(id, true)?.ok_or_else(|| {
        ApiError::BadRequest("Wrong search string. Acceptable format: list of song IDs.".to_string())
    })?;
    let storage_ids = ids
        .into_iter()
        .map(|id| {
            if id < 0 {
                id.checked_sub(1).ok_or_else(|| invalid_value(&id.to_string()))
            } else {
                Ok(id)
            }
        })
        .collect::<ApiResult<Vec<i64>>>()?;
    Ok(dedup(storage_ids))
}

/// Keep the first occurrence of each value
pub fn dedup<T: Eq + Hash + Clone>(values: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}

/// Order `items` by `keys`, dropping keys without an item
pub fn in_request_order<T, K, F>(keys: &[K], items: Vec<T>, key_of: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut by_key: HashMap<K, T> = items.into_iter().map(|item| (key_of(&item), item)).collect();
    keys.iter().filter_map(|key| by_key.remove(key)).collect()
}

/// `1,2, 3` style list (one optional space after each comma)
///
/// `Ok(None)` when the string is not shaped like a list; an error when it is
/// but a number does not fit.
fn int_list(s: &str, allow_negative: bool) -> ApiResult<Option<Vec<i64>>> {
    let mut items = Vec::new();
    for (i, part) in s.split(',').enumerate() {
        let part = if i > 0 {
            part.strip_prefix(' ').unwrap_or(part)
        } else {
            part
        };
        let digits = match part.strip_prefix('-') {
            Some(rest) if allow_negative => rest,
            _ => part,
        };
        if !is_digits(digits) {
            return Ok(None);
        }
        items.push(part);
    }

    items
        .into_iter()
        .map(|item| item.parse::<i64>().map_err(|_| invalid_value(item)))
        .collect::<ApiResult<Vec<_>>>()
        .map(Some)
}

/// `a-b`, `-b`, `a..` or `a..b`
fn id_range(s: &str) -> ApiResult<Option<(Option<i64>, Option<i64>)>> {
    let (from, to) = if let Some((lo, hi)) = s.split_once("..") {
        if !is_digits(lo) || !(hi.is_empty() || is_digits(hi)) {
            return Ok(None);
        }
        (lo, hi)
    } else if let Some((lo, hi)) = s.split_once('-') {
        if !(lo.is_empty() || is_digits(lo)) || !is_digits(hi) {
            return Ok(None);
        }
        (lo, hi)
    } else {
        return Ok(None);
    };

    let bound = |v: &str| -> ApiResult<Option<i64>> {
        if v.is_empty() {
            Ok(None)
        } else {
            v.parse().map(Some).map_err(|_| invalid_value(v))
        }
    };
    Ok(Some((bound(from)?, bound(to)?)))
}

/// Comma list of numbers, `from-to` ranges and aliases
fn range_list(value: &str, aliases: &[(&str, &[u8])]) -> ApiResult<Vec<u8>> {
    let mut out = Vec::new();
    for item in value.split(',').map(str::trim) {
        if let Some((from, to)) = item.split_once('-') {
            let from: u8 = from.parse().map_err(|_| invalid_value(item))?;
            let to: u8 = to.parse().map_err(|_| invalid_value(item))?;
            out.extend(from..=to);
        } else if let Some((_, values)) = aliases.iter().find(|(alias, _)| *alias == item) {
            out.extend_from_slice(values);
        } else {
            out.push(item.parse().map_err(|_| invalid_value(item))?);
        }
    }
    Ok(out)
}

fn number_list<T: FromStr>(value: &str) -> ApiResult<Vec<T>> {
    value
        .split(',')
        .map(str::trim)
        .map(|item| item.parse().map_err(|_| invalid_value(item)))
        .collect()
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_level_name(s: &str) -> bool {
    LEVEL_NAME_LEN.contains(&s.len())
        && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b' ' || b == b'-')
}

fn is_player_name(s: &str) -> bool {
    PLAYER_NAME_LEN.contains(&s.len()) && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b' ')
}

fn invalid_value(item: &str) -> ApiError {
    ApiError::BadRequest(format!("Invalid value: {:?}", item))
}
