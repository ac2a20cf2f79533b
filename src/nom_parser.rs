use nom::branch::alt;
use nom::character::complete::{char, digit1, multispace0};
use nom::combinator::{all_consuming, map, map_res, opt, recognize};
use nom::multi::many0;
use nom::sequence::{pair, preceded, terminated};
use nom::{Finish, IResult};

type Buf = [u8];

/// A window holding only zero-padded decimal digits.
pub(crate) fn digits_field(window: &Buf) -> Option<u32> {
    complete(all_consuming(map_int(digit1))(window))
}

/// A window holding `+` followed by zero-padded decimal digits.
pub(crate) fn unsigned_field(window: &Buf) -> Option<u32> {
    complete(all_consuming(preceded(char('+'), map_int(digit1)))(window))
}

/// A window holding a sign character followed by decimal digits.
pub(crate) fn signed_field(window: &Buf) -> Option<i32> {
    complete(all_consuming(map_int(recognize(pair(sign, digit1))))(window))
}

/// Signed decimals separated by whitespace, or run together where the next
/// value starts with its sign: `00000001 00000002 -00000003+00000004`.
pub(crate) fn bulk_samples(payload: &Buf) -> Option<Vec<i32>> {
    complete(all_consuming(terminated(
        many0(preceded(multispace0, sample)),
        multispace0,
    ))(payload))
}

// the sign may be set apart from its digits: `+ 00000005`
fn sample(buf: &Buf) -> IResult<&Buf, i32> {
    map(
        pair(opt(sign), preceded(multispace0, map_int(digit1))),
        |(sign, value): (Option<char>, i32)| if sign == Some('-') { -value } else { value },
    )(buf)
}

fn sign(buf: &Buf) -> IResult<&Buf, char> {
    alt((char('+'), char('-')))(buf)
}

fn complete<O>(result: IResult<&Buf, O>) -> Option<O> {
    result.finish().ok().map(|(_, out)| out)
}

fn map_int<'a, O, F>(first: F) -> impl FnMut(&'a Buf) -> IResult<&'a Buf, O>
where
    F: FnMut(&'a Buf) -> IResult<&'a Buf, &'a Buf>,
    O: std::str::FromStr,
{
    let to_str = map_res(first, |u: &'a Buf| std::str::from_utf8(u));
    map_res(to_str, |s| s.parse::<O>())
}
