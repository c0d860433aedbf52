//! Level filters for `find`/`count`
//!
//! A [`LevelQuery`] is an id selector plus attribute equality lists, an
//! optional ordering and limit/offset. Empty attribute lists mean "no
//! constraint".

use sqlx::{QueryBuilder, Sqlite};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum IdFilter {
    #[default]
    Any,
    List(Vec<i64>),
    /// Inclusive bounds; `None` leaves that side open
    Range { from: Option<i64>, to: Option<i64> },
    NamePrefix(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelOrder {
    Id,
    Downloads,
    Likes,
    UpdatedAt,
}

impl LevelOrder {
    fn column(self) -> &'static str {
        match self {
            LevelOrder::Id => "l.id",
            LevelOrder::Downloads => "l.downloads",
            LevelOrder::Likes => "l.likes",
            LevelOrder::UpdatedAt => "l.updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LevelQuery {
    pub ids: IdFilter,
    pub stars: Vec<u8>,
    pub demon_tiers: Vec<u8>,
    pub coins: Vec<u8>,
    pub coins_verified: Vec<bool>,
    pub cp: Vec<u8>,
    pub length: Vec<u8>,
    pub two_player: Option<bool>,
    pub authors: Vec<i64>,
    pub songs: Vec<i64>,
    pub order: Option<(LevelOrder, Direction)>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl LevelQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_ids(ids: &[i64]) -> Self {
        Self {
            ids: IdFilter::List(ids.to_vec()),
            ..Self::default()
        }
    }

    /// `id >= cursor`, ordered by id, at most `batch` rows (update loop read)
    pub fn window(cursor: i64, batch: usize) -> Self {
        Self {
            ids: IdFilter::Range {
                from: Some(cursor),
                to: None,
            },
            order: Some((LevelOrder::Id, Direction::Asc)),
            limit: Some(batch as i64),
            ..Self::default()
        }
    }

    pub fn order_by(mut self, order: LevelOrder, direction: Direction) -> Self {
        self.order = Some((order, direction));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Same filter without ordering or paging, for `count`
    pub fn unpaged(&self) -> Self {
        Self {
            order: None,
            limit: None,
            offset: None,
            ..self.clone()
        }
    }

    /// Append ` WHERE ...` (always present, `1 = 1` when unconstrained)
    pub(crate) fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" WHERE 1 = 1");

        match &self.ids {
            IdFilter::Any => {}
            IdFilter::List(ids) => push_in(qb, "l.id", ids.iter().copied()),
            IdFilter::Range { from, to } => {
                if let Some(from) = from {
                    qb.push(" AND l.id >= ").push_bind(*from);
                }
                if let Some(to) = to {
                    qb.push(" AND l.id <= ").push_bind(*to);
                }
            }
            IdFilter::NamePrefix(prefix) => {
                qb.push(" AND l.name LIKE ")
                    .push_bind(format!("{}%", escape_like(prefix)))
                    .push(" ESCAPE '\\'");
            }
        }

        push_in(qb, "l.stars", self.stars.iter().map(|&v| i64::from(v)));
        push_in(qb, "l.demon_tier", self.demon_tiers.iter().map(|&v| i64::from(v)));
        push_in(qb, "l.coins", self.coins.iter().map(|&v| i64::from(v)));
        push_in(qb, "l.verified_coins", self.coins_verified.iter().map(|&v| i64::from(v)));
        push_in(qb, "l.cp", self.cp.iter().map(|&v| i64::from(v)));
        push_in(qb, "l.length", self.length.iter().map(|&v| i64::from(v)));
        push_in(qb, "l.player_id", self.authors.iter().copied());
        push_in(qb, "l.song_id", self.songs.iter().copied());

        if let Some(two_player) = self.two_player {
            qb.push(" AND l.two_player = ").push_bind(two_player);
        }
    }

    pub(crate) fn push_order_and_page(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        if let Some((order, direction)) = self.order {
            qb.push(" ORDER BY ")
                .push(order.column())
                .push(" ")
                .push(direction.sql())
                .push(", l.id ")
                .push(direction.sql());
        }
        match (self.limit, self.offset) {
            (Some(limit), offset) => {
                qb.push(" LIMIT ").push_bind(limit);
                if let Some(offset) = offset {
                    qb.push(" OFFSET ").push_bind(offset);
                }
            }
            (None, Some(offset)) => {
                qb.push(" LIMIT -1 OFFSET ").push_bind(offset);
            }
            (None, None) => {}
        }
    }
}

/// ` AND column IN (...)`; an empty iterator adds nothing
fn push_in<I>(qb: &mut QueryBuilder<'_, Sqlite>, column: &str, values: I)
where
    I: IntoIterator<Item = i64>,
{
    let values: Vec<i64> = values.into_iter().collect();
    if values.is_empty() {
        return;
    }
    qb.push(" AND ").push(column).push(" IN (");
    let mut separated = qb.separated(", ");
    for value in values {
        separated.push_bind(value);
    }
    separated.push_unseparated(")");
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_query_shape() {
        let query = LevelQuery::window(1234, 100);
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT l.id FROM levels l");
        query.push_where(&mut qb);
        query.push_order_and_page(&mut qb);
        let sql = qb.sql();
        assert!(sql.contains("l.id >= "));
        assert!(sql.contains("ORDER BY l.id ASC"));
        assert!(sql.contains(" LIMIT "));
    }

    #[test]
    fn test_empty_lists_add_no_constraints() {
        let query = LevelQuery::all();
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT l.id FROM levels l");
        query.push_where(&mut qb);
        assert_eq!(qb.sql(), "SELECT l.id FROM levels l WHERE 1 = 1");
    }

    #[test]
    fn test_unpaged_drops_order_and_limit() {
        let query = LevelQuery::window(5, 10).unpaged();
        assert!(query.order.is_none());
        assert!(query.limit.is_none());
        assert_eq!(
            query.ids,
            IdFilter::Range {
                from: Some(5),
                to: None
            }
        );
    }
}
